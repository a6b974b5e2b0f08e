// src/services/code_generator.rs

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::models::codes::CodeKind;

/// 32 símbolos: sem 0, 1, I e O (confundíveis quando lidos em voz alta).
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

/// Gera códigos `PREFIX-XXXX-XXXX-XXXX`. Cada símbolo é sorteado de forma
/// independente; não existe contador nem componente sequencial.
#[derive(Clone)]
pub struct CodeGenerator {
    rng: Arc<Mutex<StdRng>>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Sequência determinística, para testes.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub async fn generate(&self, kind: CodeKind) -> String {
        self.generate_with_prefix(kind.prefix()).await
    }

    pub async fn generate_with_prefix(&self, prefix: &str) -> String {
        let mut rng = self.rng.lock().await;
        let mut code = String::with_capacity(prefix.len() + GROUPS * (GROUP_LEN + 1));
        code.push_str(prefix);

        for _ in 0..GROUPS {
            code.push('-');
            for _ in 0..GROUP_LEN {
                let idx = rng.gen_range(0..ALPHABET.len());
                code.push(ALPHABET[idx] as char);
            }
        }
        code
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Confere o formato `PREFIX-XXXX-XXXX-XXXX` contra o alfabeto.
pub fn is_well_formed(code: &str, prefix: &str) -> bool {
    let Some(rest) = code.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };
    let groups: Vec<&str> = rest.split('-').collect();
    groups.len() == GROUPS
        && groups
            .iter()
            .all(|g| g.len() == GROUP_LEN && g.bytes().all(|b| ALPHABET.contains(&b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn generated_codes_follow_the_printed_format() {
        let generator = CodeGenerator::seeded(7);
        for _ in 0..200 {
            let coach = generator.generate(CodeKind::Coach).await;
            let member = generator.generate(CodeKind::Member).await;

            assert_eq!(coach.len(), "COACH-XXXX-XXXX-XXXX".len());
            assert_eq!(member.len(), "TEAM-XXXX-XXXX-XXXX".len());
            assert!(is_well_formed(&coach, "COACH"), "{coach}");
            assert!(is_well_formed(&member, "TEAM"), "{member}");
        }
    }

    #[tokio::test]
    async fn ambiguous_symbols_never_appear() {
        let generator = CodeGenerator::seeded(42);
        for _ in 0..500 {
            let code = generator.generate(CodeKind::Member).await;
            let body = code.trim_start_matches("TEAM-");
            assert!(!body.contains(['0', '1', 'I', 'O']), "{code}");
        }
    }

    #[tokio::test]
    async fn every_symbol_of_the_alphabet_is_reachable() {
        let generator = CodeGenerator::seeded(3);
        let mut seen = HashSet::new();
        for _ in 0..400 {
            let code = generator.generate(CodeKind::Coach).await;
            seen.extend(code.trim_start_matches("COACH-").bytes().filter(|b| *b != b'-'));
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(!is_well_formed("TEAM-ABCD-EFGH", "TEAM"));
        assert!(!is_well_formed("TEAM-ABCD-EFGH-IJKL", "TEAM"));
        assert!(!is_well_formed("COACH-ABCD-EFGH-JKLM", "TEAM"));
        assert!(!is_well_formed("TEAM-abcd-EFGH-JKLM", "TEAM"));
        assert!(is_well_formed("TEAM-ABCD-EFGH-JKLM", "TEAM"));
    }
}
