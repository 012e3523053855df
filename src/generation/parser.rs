use std::sync::OnceLock;

use regex::Regex;

use crate::models::question::{QuestionOuverte, VraiFaux};

/// Item QCM extrait d'une sortie brute de modèle, avant enrichissement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QcmBrut {
    pub question: String,
    pub options: [String; 4],
    /// Index 1-based de la bonne réponse
    pub bonne_reponse: u8,
    /// Vrai si la lettre de réponse était introuvable et que 'A' a été
    /// prise par défaut
    pub lettre_par_defaut: bool,
}

fn re_labelled_avec_reponse() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)Q(?:uestion)?\s*:\s*(.*?)\s*A\)\s*(.*?)\s*B\)\s*(.*?)\s*C\)\s*(.*?)\s*D\)\s*(.*?)\s*(?:Answer|Réponse|Correct)\s*:\s*([A-Da-d])",
        )
        .expect("regex QCM labellisée invalide")
    })
}

fn re_labelled_sans_reponse() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)Q(?:uestion)?\s*:\s*(.*?)\s*A\)\s*(.*?)\s*B\)\s*(.*?)\s*C\)\s*(.*?)\s*D\)\s*(.*?)\s*$",
        )
        .expect("regex QCM sans réponse invalide")
    })
}

fn re_compact_options() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)Q(?:uestion)?\s*:\s*(.*?)\s*Options\s*:\s*A[).]?\s*(.+?)\s*\.?\s*B[).]?\s*(.+?)\s*\.?\s*C[).]?\s*(.+?)\s*\.?\s*D[).]?\s*(.+?)\s*\.?\s*(?:Answer|Réponse|Correct)\s*:\s*([A-Da-d])",
        )
        .expect("regex QCM compacte invalide")
    })
}

fn re_lettre_reponse() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:Answer|Réponse|Correct)\s*:?\s*([A-Da-d])\b").expect("regex lettre invalide")
    })
}

/// 'A'..'D' (casse ignorée) → index 1..4
fn lettre_vers_index(lettre: &str) -> u8 {
    let c = lettre
        .chars()
        .next()
        .unwrap_or('A')
        .to_ascii_uppercase();
    (c as u8) - b'A' + 1
}

fn construire(
    question: &str,
    options: [&str; 4],
    bonne_reponse: u8,
    lettre_par_defaut: bool,
) -> Option<QcmBrut> {
    let question = question.trim();
    if question.is_empty() {
        return None;
    }
    let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if options.iter().any(|o| o.is_empty()) {
        return None;
    }
    Some(QcmBrut {
        question: question.to_string(),
        options: [
            options[0].clone(),
            options[1].clone(),
            options[2].clone(),
            options[3].clone(),
        ],
        bonne_reponse,
        lettre_par_defaut,
    })
}

/// Extrait un item QCM d'une sortie libre de modèle
///
/// Les grammaires sont essayées dans un ordre fixe: format labellisé
/// (`Q: … A) … Answer: X`, retours à la ligne facultatifs), format compact
/// `Options:`, puis repli ligne à ligne. Si les quatre options sont trouvées
/// mais pas la lettre de réponse, 'A' est prise par défaut et l'item est
/// marqué `lettre_par_defaut`, charge à l'appelant de le signaler.
pub fn parser_qcm(sortie: &str) -> Option<QcmBrut> {
    let sortie = sortie.trim();
    if sortie.is_empty() {
        return None;
    }

    if let Some(cap) = re_labelled_avec_reponse().captures(sortie) {
        return construire(
            &cap[1],
            [&cap[2], &cap[3], &cap[4], &cap[5]],
            lettre_vers_index(&cap[6]),
            false,
        );
    }

    if let Some(cap) = re_compact_options().captures(sortie) {
        return construire(
            &cap[1],
            [&cap[2], &cap[3], &cap[4], &cap[5]],
            lettre_vers_index(&cap[6]),
            false,
        );
    }

    if let Some(cap) = re_labelled_sans_reponse().captures(sortie) {
        return construire(&cap[1], [&cap[2], &cap[3], &cap[4], &cap[5]], 1, true);
    }

    parser_qcm_lignes(sortie)
}

/// Retire un éventuel marqueur "A)" / "b." / "1:" en tête de ligne d'option
fn retirer_marqueur_option(ligne: &str) -> &str {
    let mut chars = ligne.chars();
    let premier = chars.next();
    let deuxieme = chars.next();
    match (premier, deuxieme) {
        (Some(p), Some(d))
            if matches!(p.to_ascii_uppercase(), 'A'..='D' | '1'..='4')
                && matches!(d, ')' | '.' | ':') =>
        {
            ligne[2..].trim()
        }
        _ => ligne,
    }
}

/// Repli: première ligne interrogative puis quatre lignes d'options
fn parser_qcm_lignes(sortie: &str) -> Option<QcmBrut> {
    let lignes: Vec<&str> = sortie
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lignes.len() < 5 {
        return None;
    }

    let question = lignes[0];
    if !question.contains('?') {
        return None;
    }

    let mut options = Vec::with_capacity(4);
    for ligne in &lignes[1..] {
        if options.len() == 4 {
            break;
        }
        if re_lettre_reponse().is_match(ligne) {
            break;
        }
        options.push(retirer_marqueur_option(ligne).to_string());
    }
    if options.len() < 4 {
        return None;
    }

    let (bonne_reponse, lettre_par_defaut) = match re_lettre_reponse().captures(sortie) {
        Some(cap) => (lettre_vers_index(&cap[1]), false),
        None => (1, true),
    };

    construire(
        question,
        [&options[0], &options[1], &options[2], &options[3]],
        bonne_reponse,
        lettre_par_defaut,
    )
}

fn re_vrai_faux() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)(?:Statement|Affirmation)\s*:\s*(.*?)\s*(?:Answer|Réponse)\s*:\s*(True|False|Vrai|Faux)\b\s*(?:(?:Explanation|Explication)\s*:\s*(.*))?",
        )
        .expect("regex vrai/faux invalide")
    })
}

/// Extrait une affirmation Vrai/Faux d'une sortie libre
pub fn parser_vrai_faux(sortie: &str) -> Option<VraiFaux> {
    let cap = re_vrai_faux().captures(sortie.trim())?;
    let texte = cap[1].trim().to_string();
    if texte.is_empty() {
        return None;
    }
    let reponse_correcte = matches!(
        cap[2].to_lowercase().as_str(),
        "true" | "vrai"
    );
    let explication = cap
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some(VraiFaux {
        texte,
        reponse_correcte,
        explication,
    })
}

fn re_question_ouverte() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)Question\s*:\s*(.*?)\s*(?:Expected answer|Réponse attendue)\s*:\s*(.*?)\s*(?:(?:Keywords|Mots-clés)\s*:\s*(.*))?$",
        )
        .expect("regex question ouverte invalide")
    })
}

/// Extrait une question ouverte (question, corrigé type, mots-clés)
pub fn parser_question_ouverte(sortie: &str, contexte_source: &str) -> Option<QuestionOuverte> {
    let cap = re_question_ouverte().captures(sortie.trim())?;
    let texte = cap[1].trim().to_string();
    let reponse_attendue = cap[2].trim().to_string();
    if texte.is_empty() || reponse_attendue.is_empty() {
        return None;
    }
    let mots_cles = cap
        .get(3)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Some(QuestionOuverte {
        texte,
        reponse_attendue,
        mots_cles,
        contexte_source: contexte_source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_compact_sans_retours_ligne() {
        let q = parser_qcm("Q: What is 2+2?A) 3B) 4C) 5D) 6Answer:B").unwrap();
        assert_eq!(q.question, "What is 2+2?");
        assert_eq!(q.options, ["3", "4", "5", "6"]);
        assert_eq!(q.bonne_reponse, 2);
        assert!(!q.lettre_par_defaut);
    }

    #[test]
    fn format_labellise_multiligne() {
        let sortie = "Q: What is the capital of France?\nA) London\nB) Paris\nC) Berlin\nD) Madrid\nAnswer: B";
        let q = parser_qcm(sortie).unwrap();
        assert_eq!(q.question, "What is the capital of France?");
        assert_eq!(q.options[1], "Paris");
        assert_eq!(q.bonne_reponse, 2);
    }

    #[test]
    fn format_options_compact() {
        let sortie = "Q: Which gas do plants absorb?Options:A Oxygen.B Carbon dioxide.C Nitrogen.D Helium.Answer:B";
        let q = parser_qcm(sortie).unwrap();
        assert_eq!(q.question, "Which gas do plants absorb?");
        assert_eq!(q.bonne_reponse, 2);
    }

    #[test]
    fn lettre_introuvable_defaut_a() {
        let sortie = "Q: What is water made of?\nA) H2O\nB) CO2\nC) NaCl\nD) O3";
        let q = parser_qcm(sortie).unwrap();
        assert_eq!(q.bonne_reponse, 1);
        assert!(q.lettre_par_defaut);
    }

    #[test]
    fn lettre_minuscule_acceptee() {
        let q = parser_qcm("Q: Quoi ?A) unB) deuxC) troisD) quatreAnswer: d").unwrap();
        assert_eq!(q.bonne_reponse, 4);
    }

    #[test]
    fn option_vide_rejetee() {
        assert!(parser_qcm("Q: Quoi ?A) B) deuxC) troisD) quatreAnswer: A").is_none());
    }

    #[test]
    fn sortie_inexploitable_rejetee() {
        assert!(parser_qcm("").is_none());
        assert!(parser_qcm("Le modèle n'a rien produit d'utile.").is_none());
        assert!(parser_qcm("Q: Une question seule ?").is_none());
    }

    #[test]
    fn repli_ligne_a_ligne() {
        let sortie = "Why is the sky blue?\n1. Rayleigh scattering\n2. Ozone\n3. Water vapor\n4. Dust\nAnswer: A";
        let q = parser_qcm(sortie).unwrap();
        assert_eq!(q.question, "Why is the sky blue?");
        assert_eq!(q.options[0], "Rayleigh scattering");
        assert_eq!(q.bonne_reponse, 1);
        assert!(!q.lettre_par_defaut);
    }

    #[test]
    fn vrai_faux_complet() {
        let sortie = "Statement: The Earth is flat.\nAnswer: False\nExplanation: The Earth is an oblate spheroid.";
        let vf = parser_vrai_faux(sortie).unwrap();
        assert_eq!(vf.texte, "The Earth is flat.");
        assert!(!vf.reponse_correcte);
        assert!(vf.explication.contains("spheroid"));
    }

    #[test]
    fn vrai_faux_francais() {
        let sortie = "Affirmation: L'eau bout à 100 degrés.\nRéponse: Vrai";
        let vf = parser_vrai_faux(sortie).unwrap();
        assert!(vf.reponse_correcte);
        assert!(vf.explication.is_empty());
    }

    #[test]
    fn question_ouverte_complete() {
        let sortie = "Question: Explain photosynthesis.\nExpected answer: Plants convert light into chemical energy.\nKeywords: light, energy, chlorophyll";
        let q = parser_question_ouverte(sortie, "contexte").unwrap();
        assert_eq!(q.texte, "Explain photosynthesis.");
        assert_eq!(q.mots_cles, vec!["light", "energy", "chlorophyll"]);
        assert_eq!(q.contexte_source, "contexte");
    }

    #[test]
    fn question_ouverte_sans_mots_cles() {
        let sortie = "Question: Why?\nExpected answer: Because.";
        let q = parser_question_ouverte(sortie, "ctx").unwrap();
        assert!(q.mots_cles.is_empty());
    }
}
