//! Recommandations pédagogiques après correction
//!
//! Agrégation pure des scores de similarité d'un étudiant: moyenne,
//! classement des notions manquées, points forts et conseils. Aucun appel
//! externe, le module se contente de résumer ce que la correction a mesuré.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::submission::ScoreSimilarite;

/// Notion absente des réponses, avec son nombre d'occurrences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionLacunaire {
    pub mot_cle: String,
    pub occurrences: usize,
}

/// Bilan pédagogique d'une série de réponses ouvertes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommandations {
    pub score_moyen: f64,
    pub appreciation: String,
    /// Notions manquées, de la plus fréquente à la moins fréquente (cinq au plus)
    pub notions_a_revoir: Vec<NotionLacunaire>,
    /// Questions bien traitées (score ≥ 0,75)
    pub points_forts: Vec<String>,
    pub conseils_etudiant: Vec<String>,
    pub conseils_enseignant: Vec<String>,
    /// Prochaine étape de travail suggérée selon le palier atteint
    pub progression_suggeree: Vec<String>,
}

fn appreciation(score_moyen: f64) -> &'static str {
    if score_moyen >= 0.9 {
        "Maîtrise excellente de l'ensemble des notions."
    } else if score_moyen >= 0.75 {
        "Bonne maîtrise globale, quelques points à consolider."
    } else if score_moyen >= 0.6 {
        "Maîtrise correcte mais fragile, un approfondissement est conseillé."
    } else if score_moyen >= 0.4 {
        "Maîtrise partielle, plusieurs notions sont à retravailler."
    } else {
        "Notions non acquises, une reprise complète du chapitre s'impose."
    }
}

/// Construit le bilan pédagogique depuis les scores par question
///
/// `resultats` associe le texte de chaque question à son score de
/// similarité. Une liste vide donne un bilan neutre.
pub fn generer_recommandations(resultats: &[(String, ScoreSimilarite)]) -> Recommandations {
    if resultats.is_empty() {
        return Recommandations {
            score_moyen: 0.0,
            appreciation: "Aucune réponse à analyser.".to_string(),
            notions_a_revoir: Vec::new(),
            points_forts: Vec::new(),
            conseils_etudiant: Vec::new(),
            conseils_enseignant: Vec::new(),
            progression_suggeree: Vec::new(),
        };
    }

    let score_moyen = resultats
        .iter()
        .map(|(_, s)| s.score_final)
        .sum::<f64>()
        / resultats.len() as f64;

    // Fréquence des mots-clés manquants, toutes questions confondues
    let mut frequences: HashMap<&str, usize> = HashMap::new();
    for (_, score) in resultats {
        for mot in &score.mots_cles_manquants {
            *frequences.entry(mot.as_str()).or_insert(0) += 1;
        }
    }
    let mut notions_a_revoir: Vec<NotionLacunaire> = frequences
        .into_iter()
        .map(|(mot_cle, occurrences)| NotionLacunaire {
            mot_cle: mot_cle.to_string(),
            occurrences,
        })
        .collect();
    notions_a_revoir.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.mot_cle.cmp(&b.mot_cle))
    });
    notions_a_revoir.truncate(5);

    let points_forts: Vec<String> = resultats
        .iter()
        .filter(|(_, s)| s.score_final >= 0.75)
        .map(|(question, _)| question.clone())
        .collect();

    let mut conseils_etudiant = Vec::new();
    if let Some(pire) = notions_a_revoir.first() {
        conseils_etudiant.push(format!(
            "Revoyez en priorité la notion « {} », absente de {} réponse(s).",
            pire.mot_cle, pire.occurrences
        ));
    }
    if score_moyen < 0.6 {
        conseils_etudiant
            .push("Relisez le cours avant de refaire l'évaluation.".to_string());
    } else if score_moyen < 0.9 {
        conseils_etudiant
            .push("Appuyez vos réponses sur les termes précis du cours.".to_string());
    }

    let mut conseils_enseignant = Vec::new();
    let seuil_classe = resultats.len().div_ceil(2);
    for notion in notions_a_revoir
        .iter()
        .filter(|n| n.occurrences >= seuil_classe)
    {
        conseils_enseignant.push(format!(
            "La notion « {} » est souvent absente, une reprise en classe serait utile.",
            notion.mot_cle
        ));
    }
    if score_moyen >= 0.9 {
        conseils_enseignant
            .push("Niveau solide, des exercices d'approfondissement sont envisageables.".to_string());
    }

    let mut progression_suggeree = Vec::new();
    if score_moyen >= 0.9 {
        progression_suggeree
            .push("Abordez des exercices d'approfondissement ou un chapitre suivant.".to_string());
    } else if score_moyen >= 0.75 {
        progression_suggeree
            .push("Tentez une évaluation de difficulté supérieure sur le même chapitre.".to_string());
    } else if score_moyen >= 0.6 {
        progression_suggeree
            .push("Refaites une évaluation du même niveau après révision ciblée.".to_string());
    } else {
        progression_suggeree
            .push("Reprenez le chapitre avec une évaluation de niveau facile.".to_string());
    }
    if !notions_a_revoir.is_empty() {
        progression_suggeree.push(format!(
            "Travaillez d'abord les notions listées à revoir ({}).",
            notions_a_revoir
                .iter()
                .map(|n| n.mot_cle.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    Recommandations {
        score_moyen,
        appreciation: appreciation(score_moyen).to_string(),
        notions_a_revoir,
        points_forts,
        conseils_etudiant,
        conseils_enseignant,
        progression_suggeree,
    }
}

/// Formate le feedback complet d'un étudiant depuis son bilan pédagogique
///
/// Sections dans l'ordre: note, niveau de maîtrise, recommandations, points
/// forts, notions à revoir, prochaine étape. Les sections vides sont omises.
pub fn formater_feedback_complet(
    note_sur_20: f64,
    pourcentage: f64,
    reco: &Recommandations,
) -> String {
    let mut parts = vec![
        format!("📊 Note obtenue : {:.2}/20 ({:.1}%)", note_sur_20, pourcentage),
        String::new(),
        format!("🎯 Niveau de maîtrise : {}", reco.appreciation),
        String::new(),
    ];

    if !reco.conseils_etudiant.is_empty() {
        parts.push("💡 Recommandations :".to_string());
        for conseil in &reco.conseils_etudiant {
            parts.push(format!("  • {}", conseil));
        }
        parts.push(String::new());
    }

    if !reco.points_forts.is_empty() {
        parts.push(format!("✅ Points forts : {}", reco.points_forts.join(", ")));
        parts.push(String::new());
    }

    if !reco.notions_a_revoir.is_empty() {
        let notions: Vec<&str> = reco
            .notions_a_revoir
            .iter()
            .map(|n| n.mot_cle.as_str())
            .collect();
        parts.push(format!("📚 À revoir : {}", notions.join(", ")));
        parts.push(String::new());
    }

    if let Some(etape) = reco.progression_suggeree.first() {
        parts.push(format!("🚀 Prochaine étape : {}", etape));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(final_: f64, manquants: &[&str]) -> ScoreSimilarite {
        ScoreSimilarite {
            score_semantique: final_,
            couverture_mots_cles: 0.5,
            score_final: final_,
            est_correcte: final_ >= 0.6,
            feedback: String::new(),
            mots_cles_trouves: Vec::new(),
            mots_cles_manquants: manquants.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn bilan_vide() {
        let r = generer_recommandations(&[]);
        assert_eq!(r.score_moyen, 0.0);
        assert!(r.notions_a_revoir.is_empty());
    }

    #[test]
    fn moyenne_et_appreciation() {
        let resultats = vec![
            ("Q1".to_string(), score(0.8, &[])),
            ("Q2".to_string(), score(0.6, &[])),
        ];
        let r = generer_recommandations(&resultats);
        assert!((r.score_moyen - 0.7).abs() < 1e-9);
        assert!(r.appreciation.contains("fragile"));
    }

    #[test]
    fn notions_classees_par_frequence() {
        let resultats = vec![
            ("Q1".to_string(), score(0.5, &["glucose", "lumière"])),
            ("Q2".to_string(), score(0.5, &["glucose"])),
            ("Q3".to_string(), score(0.5, &["chlorophylle", "glucose"])),
        ];
        let r = generer_recommandations(&resultats);
        assert_eq!(r.notions_a_revoir[0].mot_cle, "glucose");
        assert_eq!(r.notions_a_revoir[0].occurrences, 3);
        // Égalité départagée par ordre alphabétique
        assert_eq!(r.notions_a_revoir[1].mot_cle, "chlorophylle");
    }

    #[test]
    fn points_forts_au_dessus_du_palier() {
        let resultats = vec![
            ("Bien traitée".to_string(), score(0.8, &[])),
            ("Ratée".to_string(), score(0.3, &["notion"])),
        ];
        let r = generer_recommandations(&resultats);
        assert_eq!(r.points_forts, vec!["Bien traitée"]);
    }

    #[test]
    fn notions_plafonnees_a_cinq() {
        let resultats = vec![(
            "Q1".to_string(),
            score(0.5, &["a", "b", "c", "d", "e", "f", "g"]),
        )];
        let r = generer_recommandations(&resultats);
        assert_eq!(r.notions_a_revoir.len(), 5);
        // Égalité de fréquence, l'ordre alphabétique tranche
        assert_eq!(r.notions_a_revoir[0].mot_cle, "a");
        assert_eq!(r.notions_a_revoir[4].mot_cle, "e");
    }

    #[test]
    fn progression_selon_le_palier() {
        let haut = generer_recommandations(&[("Q1".to_string(), score(0.95, &[]))]);
        assert!(haut.progression_suggeree[0].contains("approfondissement"));

        let moyen = generer_recommandations(&[("Q1".to_string(), score(0.65, &[]))]);
        assert!(moyen.progression_suggeree[0].contains("même niveau"));

        let bas = generer_recommandations(&[("Q1".to_string(), score(0.2, &["osmose"]))]);
        assert!(bas.progression_suggeree[0].contains("facile"));
        assert!(bas.progression_suggeree[1].contains("osmose"));
    }

    #[test]
    fn feedback_complet_assemble_les_sections() {
        let resultats = vec![
            ("Bien traitée".to_string(), score(0.8, &[])),
            ("Ratée".to_string(), score(0.3, &["osmose"])),
        ];
        let reco = generer_recommandations(&resultats);
        let feedback = formater_feedback_complet(11.0, 55.0, &reco);
        assert!(feedback.starts_with("📊 Note obtenue : 11.00/20 (55.0%)"));
        assert!(feedback.contains("🎯 Niveau de maîtrise"));
        assert!(feedback.contains("✅ Points forts : Bien traitée"));
        assert!(feedback.contains("📚 À revoir : osmose"));
        assert!(feedback.contains("🚀 Prochaine étape"));
    }

    #[test]
    fn conseil_enseignant_sur_notion_recurrente() {
        let resultats = vec![
            ("Q1".to_string(), score(0.5, &["osmose"])),
            ("Q2".to_string(), score(0.5, &["osmose"])),
            ("Q3".to_string(), score(0.8, &[])),
        ];
        let r = generer_recommandations(&resultats);
        assert!(r
            .conseils_enseignant
            .iter()
            .any(|c| c.contains("osmose")));
    }
}
