//! Chart builders. Every figure is written as a standalone Plotly HTML page.

pub mod before_after;
pub mod dashboard;
pub mod figure;
pub mod visualizations;

pub use figure::{palette, Figure, Grid};
