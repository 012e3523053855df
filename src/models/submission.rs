use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, WorkflowError};

/// Statut d'une soumission dans le workflow de correction
///
/// Transitions autorisées: Soumise → EnCorrection → Corrigee, et
/// Soumise → Retiree. Toute autre transition est refusée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutSoumission {
    Soumise,
    EnCorrection,
    Corrigee,
    Retiree,
}

impl StatutSoumission {
    pub fn name(self) -> &'static str {
        match self {
            StatutSoumission::Soumise => "soumise",
            StatutSoumission::EnCorrection => "en_correction",
            StatutSoumission::Corrigee => "corrigée",
            StatutSoumission::Retiree => "retirée",
        }
    }

    /// La transition vers `cible` est-elle autorisée ?
    pub fn peut_passer_a(self, cible: StatutSoumission) -> bool {
        matches!(
            (self, cible),
            (StatutSoumission::Soumise, StatutSoumission::EnCorrection)
                | (StatutSoumission::EnCorrection, StatutSoumission::Corrigee)
                | (StatutSoumission::Soumise, StatutSoumission::Retiree)
        )
    }
}

impl std::fmt::Display for StatutSoumission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Réponse donnée à un item: option choisie (1 à 4) pour un choix multiple,
/// texte libre pour une question ouverte
///
/// La représentation JSON est sans étiquette: un nombre est un choix, une
/// chaîne est une réponse libre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reponse {
    Choix(u8),
    Texte(String),
}

impl Reponse {
    pub fn choix(&self) -> Option<u8> {
        match self {
            Reponse::Choix(selection) => Some(*selection),
            Reponse::Texte(_) => None,
        }
    }

    pub fn texte(&self) -> Option<&str> {
        match self {
            Reponse::Texte(texte) => Some(texte),
            Reponse::Choix(_) => None,
        }
    }
}

/// Soumission d'un étudiant pour un QCM
///
/// Les réponses sont un mappage item → réponse (option choisie ou texte
/// libre), validé à la construction. Au plus une soumission non retirée par
/// couple (étudiant, QCM).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Soumission {
    pub id: u64,
    pub etudiant_id: u64,
    pub qcm_id: u64,
    /// item_id → réponse donnée
    pub reponses: BTreeMap<u64, Reponse>,
    pub statut: StatutSoumission,
    pub date_soumission: DateTime<Utc>,
}

impl Soumission {
    /// Construit une soumission en validant chaque sélection (1 à 4)
    pub fn new(
        id: u64,
        etudiant_id: u64,
        qcm_id: u64,
        reponses: BTreeMap<u64, Reponse>,
    ) -> AppResult<Self> {
        for (item_id, reponse) in &reponses {
            if let Reponse::Choix(selection) = reponse {
                if !(1..=4).contains(selection) {
                    return Err(AppError::Other(format!(
                        "sélection invalide {} pour l'item {} (attendu: 1 à 4)",
                        selection, item_id
                    )));
                }
            }
        }
        Ok(Self {
            id,
            etudiant_id,
            qcm_id,
            reponses,
            statut: StatutSoumission::Soumise,
            date_soumission: Utc::now(),
        })
    }

    /// Décode un payload JSON de réponses (`{"1": 2, "3": "texte libre"}`)
    ///
    /// Le décodage est strict: un payload malformé est une erreur, jamais
    /// une évaluation de secours.
    pub fn reponses_depuis_json(payload: &str) -> AppResult<BTreeMap<u64, Reponse>> {
        let brut: BTreeMap<String, Reponse> = serde_json::from_str(payload)?;
        let mut reponses = BTreeMap::new();
        for (cle, valeur) in brut {
            let item_id: u64 = cle.parse().map_err(|_| {
                AppError::Other(format!("clé d'item invalide dans le payload: '{}'", cle))
            })?;
            reponses.insert(item_id, valeur);
        }
        Ok(reponses)
    }

    /// Applique une transition de statut, refusée si non autorisée
    pub fn transitionner(&mut self, cible: StatutSoumission) -> AppResult<()> {
        if !self.statut.peut_passer_a(cible) {
            return Err(AppError::Workflow(WorkflowError::InvalidTransition {
                from: self.statut.name(),
                to: cible.name(),
            }));
        }
        self.statut = cible;
        Ok(())
    }

    /// La soumission compte-t-elle pour la garde d'unicité ?
    pub fn est_active(&self) -> bool {
        self.statut != StatutSoumission::Retiree
    }
}

/// Détail de correction d'un item, conservé dans le résultat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailCorrection {
    pub item_id: u64,
    /// Option choisie par l'étudiant, `None` si l'item est resté sans
    /// réponse ou s'il est ouvert
    pub selection: Option<u8>,
    /// Bonne réponse d'un choix multiple, `None` pour un item ouvert
    pub bonne_reponse: Option<u8>,
    pub correcte: bool,
    /// Points obtenus: 0 ou 1 pour un choix multiple, score composite
    /// dans [0, 1] pour une réponse ouverte
    pub points: f64,
    /// Feedback du correcteur sémantique, `None` pour un choix multiple
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Résultat de correction d'une soumission, immuable une fois écrit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resultat {
    pub id: u64,
    pub soumission_id: u64,
    pub etudiant_id: u64,
    pub qcm_id: u64,
    /// Nombre d'items jugés corrects
    pub score: u32,
    /// Nombre d'items du QCM
    pub total: u32,
    /// Part des points obtenus, crédit partiel des réponses ouvertes compris
    pub pourcentage: f64,
    pub note_sur_20: f64,
    /// Feedback formaté destiné à l'étudiant
    pub feedback: String,
    pub details: Vec<DetailCorrection>,
    pub date_correction: DateTime<Utc>,
}

impl Resultat {
    /// Calcule pourcentage et note sur 20 depuis les points obtenus
    #[allow(clippy::too_many_arguments)]
    pub fn depuis_points(
        id: u64,
        soumission_id: u64,
        etudiant_id: u64,
        qcm_id: u64,
        score: u32,
        total: u32,
        points: f64,
        details: Vec<DetailCorrection>,
    ) -> Self {
        let pourcentage = if total == 0 {
            0.0
        } else {
            100.0 * points / f64::from(total)
        };
        let note_sur_20 = pourcentage / 100.0 * 20.0;
        Self {
            id,
            soumission_id,
            etudiant_id,
            qcm_id,
            score,
            total,
            pourcentage,
            note_sur_20,
            feedback: String::new(),
            details,
            date_correction: Utc::now(),
        }
    }

    /// Cas tout-ou-rien: un point par item correct
    pub fn depuis_score(
        id: u64,
        soumission_id: u64,
        etudiant_id: u64,
        qcm_id: u64,
        score: u32,
        total: u32,
        details: Vec<DetailCorrection>,
    ) -> Self {
        Self::depuis_points(
            id,
            soumission_id,
            etudiant_id,
            qcm_id,
            score,
            total,
            f64::from(score),
            details,
        )
    }

    pub fn avec_feedback(mut self, feedback: String) -> Self {
        self.feedback = feedback;
        self
    }

    /// Réussite au sens scolaire: note ≥ 10/20
    pub fn est_reussi(&self) -> bool {
        self.note_sur_20 >= 10.0
    }
}

/// Score détaillé d'une réponse ouverte
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSimilarite {
    /// Similarité sémantique dans [0, 1]
    pub score_semantique: f64,
    /// Couverture des mots-clés dans [0, 1]
    pub couverture_mots_cles: f64,
    /// Score composite dans [0, 1]
    pub score_final: f64,
    pub est_correcte: bool,
    pub feedback: String,
    pub mots_cles_trouves: Vec<String>,
    pub mots_cles_manquants: Vec<String>,
}

/// Bilan d'une correction en masse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingSummary {
    pub qcm_id: u64,
    pub soumissions_corrigees: usize,
    pub note_moyenne: f64,
    pub note_min: f64,
    pub note_max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choix(pairs: &[(u64, u8)]) -> BTreeMap<u64, Reponse> {
        pairs
            .iter()
            .map(|(id, s)| (*id, Reponse::Choix(*s)))
            .collect()
    }

    #[test]
    fn soumission_valide() {
        let s = Soumission::new(1, 10, 100, choix(&[(1, 2), (2, 4)]));
        assert!(s.is_ok());
        let s = s.unwrap();
        assert_eq!(s.statut, StatutSoumission::Soumise);
        assert!(s.est_active());
    }

    #[test]
    fn soumission_selection_hors_bornes_rejetee() {
        assert!(Soumission::new(1, 10, 100, choix(&[(1, 0)])).is_err());
        assert!(Soumission::new(1, 10, 100, choix(&[(1, 5)])).is_err());
    }

    #[test]
    fn soumission_avec_reponse_libre() {
        let mut reponses = choix(&[(1, 2)]);
        reponses.insert(2, Reponse::Texte("La photosynthèse produit du glucose.".to_string()));
        let s = Soumission::new(1, 10, 100, reponses).unwrap();
        assert_eq!(s.reponses[&1].choix(), Some(2));
        assert_eq!(
            s.reponses[&2].texte(),
            Some("La photosynthèse produit du glucose.")
        );
    }

    #[test]
    fn payload_json_strict() {
        let r = Soumission::reponses_depuis_json(r#"{"1": 2, "3": 4}"#).unwrap();
        assert_eq!(r.get(&1), Some(&Reponse::Choix(2)));
        assert_eq!(r.get(&3), Some(&Reponse::Choix(4)));
        // Pas d'évaluation de secours pour les payloads malformés
        assert!(Soumission::reponses_depuis_json("{'1': 2}").is_err());
        assert!(Soumission::reponses_depuis_json("n'importe quoi").is_err());
    }

    #[test]
    fn payload_json_mixte() {
        let r = Soumission::reponses_depuis_json(
            r#"{"1": 2, "3": "La lumière devient énergie chimique."}"#,
        )
        .unwrap();
        assert_eq!(r.get(&1), Some(&Reponse::Choix(2)));
        assert_eq!(
            r.get(&3),
            Some(&Reponse::Texte(
                "La lumière devient énergie chimique.".to_string()
            ))
        );
    }

    #[test]
    fn transitions_de_statut() {
        let mut s = Soumission::new(1, 10, 100, choix(&[(1, 1)])).unwrap();
        assert!(s.transitionner(StatutSoumission::Corrigee).is_err());
        s.transitionner(StatutSoumission::EnCorrection).unwrap();
        s.transitionner(StatutSoumission::Corrigee).unwrap();
        assert_eq!(s.statut, StatutSoumission::Corrigee);
        assert!(s.transitionner(StatutSoumission::Retiree).is_err());
    }

    #[test]
    fn soumission_retiree_inactive() {
        let mut s = Soumission::new(1, 10, 100, choix(&[(1, 1)])).unwrap();
        s.transitionner(StatutSoumission::Retiree).unwrap();
        assert!(!s.est_active());
    }

    #[test]
    fn resultat_trois_sur_cinq() {
        let r = Resultat::depuis_score(1, 1, 10, 100, 3, 5, Vec::new());
        assert!((r.pourcentage - 60.0).abs() < f64::EPSILON);
        assert!((r.note_sur_20 - 12.0).abs() < f64::EPSILON);
        assert!(r.est_reussi());
    }

    #[test]
    fn resultat_avec_credit_partiel() {
        // Un choix juste (1 point) et une réponse ouverte à 0.8
        let r = Resultat::depuis_points(1, 1, 10, 100, 2, 2, 1.8, Vec::new());
        assert_eq!(r.score, 2);
        assert!((r.pourcentage - 90.0).abs() < f64::EPSILON);
        assert!((r.note_sur_20 - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resultat_total_nul() {
        let r = Resultat::depuis_score(1, 1, 10, 100, 0, 0, Vec::new());
        assert_eq!(r.pourcentage, 0.0);
        assert_eq!(r.note_sur_20, 0.0);
        assert!(!r.est_reussi());
    }
}
