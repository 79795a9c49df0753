//! Deterministic member names and emails for simulated users.
//!
//! Same RNG stream = same directory, so admin searches in a seeded run
//! are reproducible.

use crate::traffic::TrafficRng;
use kudos_core::member::Member;

const FIRST_NAMES: &[&str] = &[
    "Amara", "Bilal", "Chen", "Dalia", "Emeka", "Freya", "Goran", "Hana", "Ivan", "Jun",
    "Kofi", "Leila", "Mateo", "Nadia", "Omar", "Priya", "Quinn", "Rosa", "Sven", "Tariq",
    "Uma", "Viktor", "Wen", "Ximena", "Yusuf", "Zofia", "Ana", "Björn", "Chloé", "Dev",
];

const LAST_NAMES: &[&str] = &[
    "Abara", "Bauer", "Castillo", "Dimitrov", "Eriksen", "Fofana", "Garcia", "Haddad",
    "Ito", "Jovanovic", "Kowalski", "Lindqvist", "Mensah", "Nakamura", "Okafor", "Petrov",
    "Quispe", "Rahman", "Silva", "Tanaka", "Usman", "Varga", "Weber", "Yilmaz", "Zhou",
];

const EMAIL_DOMAINS: &[&str] = &["example.org", "mail.example.com", "members.example.net"];

pub struct NameGenerator;

impl NameGenerator {
    pub fn full_name(rng: &mut TrafficRng) -> String {
        format!("{} {}", rng.pick(FIRST_NAMES), rng.pick(LAST_NAMES))
    }

    /// `first.last.N@domain`, ASCII-folded so searches by email stay simple.
    pub fn email(name: &str, index: u64, rng: &mut TrafficRng) -> String {
        let local: String = name
            .to_lowercase()
            .split_whitespace()
            .map(|part| part.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
            .collect::<Vec<_>>()
            .join(".");
        format!("{local}.{index}@{}", rng.pick(EMAIL_DOMAINS))
    }

    /// A directory entry for simulated user `index`.
    pub fn member(user_id: &str, index: u64, seed: u64) -> Member {
        // Stream offset keeps names independent of the user's traffic stream.
        let mut rng = TrafficRng::new(seed, 1_000_000 + index);
        let name = Self::full_name(&mut rng);
        let email = Self::email(&name, index, &mut rng);
        Member::new(user_id, &name, &email)
    }
}
