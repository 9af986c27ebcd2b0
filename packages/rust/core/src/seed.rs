//! Built-in topic list and motivational quotes.

use chrono::{Datelike, NaiveDate};

use studyplan_shared::Topic;

/// Seed themes as `(theme, area)`, in study order.
const SEED_TOPICS: &[(&str, &str)] = &[
    ("Atenção Básica", "preventiva"),
    ("Ética Médica (Aspectos gerais, sigilo)", "preventiva"),
    ("Hipertensão Arterial Sistêmica", "clinica"),
    ("Diabetes Mellitus", "clinica"),
    ("Síndromes Coronarianas Agudas", "clinica"),
    ("Insuficiência Cardíaca", "clinica"),
    ("Pneumonias", "clinica"),
    ("Abdome Agudo", "cirurgia"),
    ("Trauma: Atendimento Inicial (ATLS)", "cirurgia"),
    ("Hérnias da Parede Abdominal", "cirurgia"),
    ("Puericultura e Crescimento", "pediatria"),
    ("Imunizações", "pediatria"),
    ("Doenças Exantemáticas", "pediatria"),
    ("Pré-natal", "obstetricia"),
    ("Síndromes Hipertensivas da Gestação", "obstetricia"),
    ("Sangramentos da Gestação", "obstetricia"),
    ("Rastreamento do Câncer de Colo e Mama", "ginecologia"),
    ("Infecções Sexualmente Transmissíveis", "ginecologia"),
    ("Depressão e Transtornos de Ansiedade", "psiquiatria"),
    ("Emergências Psiquiátricas", "psiquiatria"),
    ("Vigilância Epidemiológica", "preventiva"),
    ("Estudos Epidemiológicos e Bioestatística", "preventiva"),
    ("Revisão Leve: Confiança no processo", "revisao"),
    ("Descanso e Organização", "revisao"),
];

const QUOTES: &[&str] = &[
    "Every page you study is one step closer to the white coat.",
    "You are stronger than any question the exam can ask.",
    "Focus and consistency beat last-minute cramming.",
    "The road is long, but your dedication is longer.",
    "Study with purpose: you are shaping the future of care.",
];

/// The built-in topic list, in the order it should be studied.
pub fn seed_topics() -> Vec<Topic> {
    SEED_TOPICS
        .iter()
        .map(|(theme, area)| Topic::new(*theme, *area))
        .collect()
}

/// A quote that stays fixed for the whole of `today`.
pub fn quote_of_the_day(today: NaiveDate) -> &'static str {
    QUOTES[today.ordinal0() as usize % QUOTES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_themes_are_unique_and_non_empty() {
        let topics = seed_topics();
        let themes: HashSet<&str> = topics.iter().map(|t| t.theme.as_str()).collect();
        assert_eq!(themes.len(), topics.len());
        assert!(topics.iter().all(|t| !t.theme.trim().is_empty()));
    }

    #[test]
    fn quote_is_stable_per_day() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(quote_of_the_day(day), quote_of_the_day(day));
        let next = day.succ_opt().unwrap();
        assert_ne!(quote_of_the_day(day), quote_of_the_day(next));
    }
}
