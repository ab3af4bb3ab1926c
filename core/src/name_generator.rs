//! Deterministic identity data: usernames, emails, IPs, user agents, hashes.
//!
//! All generation is deterministic (same RNG seed = same identities).

use crate::rng::StreamRng;
use std::collections::HashSet;

/// Deterministic identity generator using curated word lists.
pub struct NameGenerator {
    used_emails: HashSet<String>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        Self {
            used_emails: HashSet::new(),
        }
    }

    /// Base handle like "lucia.gomez" or "mperez".
    pub fn user_handle(rng: &mut StreamRng) -> String {
        let first = rng.pick(Self::first_names()).copied().unwrap_or("user").to_lowercase();
        let last = rng.pick(Self::last_names()).copied().unwrap_or("anon").to_lowercase();
        let handle = match rng.next_u64_below(3) {
            0 => format!("{first}.{last}"),
            1 => format!("{}{last}", first.chars().next().unwrap_or('x')),
            _ => format!("{first}_{last}"),
        };
        ascii_fold(&handle)
    }

    /// Unique username: handle + two digits + "_<user_id>".
    pub fn username(rng: &mut StreamRng, user_id: i64) -> String {
        let handle = Self::user_handle(rng);
        let digits = rng.int_inclusive(10, 99);
        format!("{handle}{digits}_{user_id}")
    }

    /// Email unique across this generator's lifetime.
    pub fn unique_email(&mut self, rng: &mut StreamRng) -> String {
        loop {
            let handle = Self::user_handle(rng);
            let domain = rng.pick(Self::email_domains()).copied().unwrap_or("example.com");
            let candidate = format!("{handle}@{domain}");
            if self.used_emails.insert(candidate.clone()) {
                return candidate;
            }
            let numbered = format!("{handle}{}@{domain}", rng.int_inclusive(1, 9_999));
            if self.used_emails.insert(numbered.clone()) {
                return numbered;
            }
        }
    }

    pub fn ipv4(rng: &mut StreamRng) -> String {
        format!(
            "{}.{}.{}.{}",
            rng.int_inclusive(1, 223),
            rng.int_inclusive(0, 255),
            rng.int_inclusive(0, 255),
            rng.int_inclusive(1, 254)
        )
    }

    /// 64 lowercase hex characters (the shape of a SHA-256 digest).
    pub fn hex_digest(rng: &mut StreamRng) -> String {
        (0..4).map(|_| format!("{:016x}", rng.next_u64())).collect()
    }

    pub fn user_agent(rng: &mut StreamRng) -> &'static str {
        const AGENTS: [&str; 4] = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X)",
            "Mozilla/5.0 (Android 11; Mobile)",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
        ];
        rng.pick(&AGENTS).copied().unwrap_or(AGENTS[0])
    }

    fn first_names() -> &'static [&'static str] {
        &[
            "Lucía", "Martín", "Sofía", "Mateo", "Valentina", "Santiago", "Camila", "Benjamín",
            "Isabella", "Joaquín", "Martina", "Tomás", "Catalina", "Nicolás", "Emilia", "Lautaro",
            "Victoria", "Facundo", "Florencia", "Agustín", "Julieta", "Thiago", "Renata", "Gonzalo",
            "Paula", "Diego", "Daniela", "Andrés", "Mariana", "Sebastián", "Gabriela", "Felipe",
            "Ximena", "Emiliano", "Antonella", "Ignacio", "Fernanda", "Rodrigo", "Carolina", "Franco",
        ]
    }

    fn last_names() -> &'static [&'static str] {
        &[
            "González", "Rodríguez", "Gómez", "Fernández", "López", "Díaz", "Martínez", "Pérez",
            "García", "Sánchez", "Romero", "Sosa", "Torres", "Álvarez", "Ruiz", "Ramírez",
            "Flores", "Benítez", "Acosta", "Medina", "Herrera", "Suárez", "Aguirre", "Giménez",
            "Castro", "Vargas", "Rojas", "Morales", "Ortiz", "Silva", "Muñoz", "Castillo",
            "Mendoza", "Navarro", "Ríos", "Cabrera", "Molina", "Peralta", "Vega", "Figueroa",
        ]
    }

    fn email_domains() -> &'static [&'static str] {
        &[
            "gmail.com", "hotmail.com", "yahoo.com.ar", "outlook.com", "live.com.mx",
            "correo.cl", "une.net.co", "fibertel.com.ar",
        ]
    }
}

/// Strip Spanish diacritics so handles stay ASCII.
fn ascii_fold(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
