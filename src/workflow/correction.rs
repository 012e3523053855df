//! Workflow de correction
//!
//! Façade au-dessus du store et du correcteur sémantique: dépôt des
//! soumissions, correction en masse exactement-une-fois, notation d'un
//! choix ou d'une réponse ouverte isolés.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, GradingError};
use crate::models::question::{ItemEvaluation, QuestionOuverte};
use crate::models::submission::{
    DetailCorrection, GradingSummary, Reponse, Resultat, ScoreSimilarite, Soumission,
};
use crate::services::grading_service::{NoteurReponseOuverte, SimilarityGrader};
use crate::workflow::store::AssessmentStore;

/// Corrige une soumission contre la banque d'items du QCM
///
/// Chaque item compte: un choix multiple vaut 0 ou 1 point par comparaison
/// exacte, une réponse ouverte vaut son score composite via le noteur. Un
/// item sans réponse vaut zéro. Appelée par le store sous son verrou; une
/// erreur du noteur fait échouer toute la correction avant tout commit.
pub fn corriger_soumission(
    items: &BTreeMap<u64, ItemEvaluation>,
    soumission: &Soumission,
    noteur: &dyn NoteurReponseOuverte,
) -> AppResult<(u32, f64, Vec<DetailCorrection>)> {
    let mut corrects = 0;
    let mut points = 0.0;
    let mut details = Vec::with_capacity(items.len());
    for (item_id, item) in items {
        let reponse = soumission.reponses.get(item_id);
        let detail = match item {
            ItemEvaluation::ChoixMultiple(question) => {
                let selection = reponse.and_then(Reponse::choix);
                let correcte = selection.is_some_and(|s| question.est_bonne_reponse(s));
                DetailCorrection {
                    item_id: *item_id,
                    selection,
                    bonne_reponse: Some(question.bonne_reponse),
                    correcte,
                    points: if correcte { 1.0 } else { 0.0 },
                    feedback: None,
                }
            }
            ItemEvaluation::Ouverte(question) => {
                let texte = reponse.and_then(Reponse::texte).unwrap_or("");
                let score = noteur.noter(texte, &question.reponse_attendue, &question.mots_cles)?;
                DetailCorrection {
                    item_id: *item_id,
                    selection: None,
                    bonne_reponse: None,
                    correcte: score.est_correcte,
                    points: score.score_final,
                    feedback: Some(score.feedback),
                }
            }
        };
        if detail.correcte {
            corrects += 1;
        }
        points += detail.points;
        details.push(detail);
    }
    Ok((corrects, points, details))
}

/// Feedback synthétique attaché au résultat d'une correction QCM
pub fn formater_feedback_note(note_sur_20: f64, pourcentage: f64) -> String {
    let appreciation = if note_sur_20 >= 16.0 {
        "Excellent travail."
    } else if note_sur_20 >= 14.0 {
        "Très bon travail."
    } else if note_sur_20 >= 10.0 {
        "Travail correct, continuez vos efforts."
    } else if note_sur_20 >= 8.0 {
        "Résultat insuffisant, revoyez le chapitre."
    } else {
        "Résultat très insuffisant, une reprise complète s'impose."
    };
    format!(
        "📊 Note obtenue : {:.2}/20 ({:.1}%)\n{}",
        note_sur_20, pourcentage, appreciation
    )
}

/// Façade du workflow de correction
pub struct CorrectionWorkflow<S> {
    store: S,
    grader: SimilarityGrader,
}

impl<S: AssessmentStore> CorrectionWorkflow<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            grader: SimilarityGrader::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publie la banque d'items d'une évaluation et retourne son identifiant
    pub fn publier_qcm(&self, items: Vec<ItemEvaluation>) -> u64 {
        self.store.creer_qcm(items)
    }

    /// Dépose la soumission d'un étudiant
    pub fn soumettre(
        &self,
        etudiant_id: u64,
        qcm_id: u64,
        reponses: BTreeMap<u64, Reponse>,
    ) -> AppResult<u64> {
        self.store.soumettre(etudiant_id, qcm_id, reponses)
    }

    /// Dépose une soumission depuis un payload JSON strict
    pub fn soumettre_json(&self, etudiant_id: u64, qcm_id: u64, payload: &str) -> AppResult<u64> {
        let reponses = Soumission::reponses_depuis_json(payload)?;
        self.soumettre(etudiant_id, qcm_id, reponses)
    }

    /// Corrige toutes les soumissions en attente d'un QCM
    ///
    /// Les choix multiples se corrigent par comparaison exacte, les
    /// réponses ouvertes par le correcteur sémantique. Exactement une fois
    /// par QCM: un second appel est refusé, y compris en cas d'appels
    /// concurrents.
    pub fn corriger_qcm(&self, qcm_id: u64) -> AppResult<GradingSummary> {
        let resume = self.store.corriger_en_masse(qcm_id, &self.grader)?;
        info!(
            "correction du QCM {} publiée ({} copies)",
            qcm_id, resume.soumissions_corrigees
        );
        Ok(resume)
    }

    /// Note un choix isolé contre l'item référencé
    pub fn noter_choix(&self, qcm_id: u64, item_id: u64, selection: u8) -> AppResult<bool> {
        let items = self
            .store
            .qcm(qcm_id)
            .ok_or_else(|| AppError::Other(format!("QCM {} introuvable", qcm_id)))?;
        let item = items
            .get(&item_id)
            .ok_or(AppError::Grading(GradingError::UnknownItem { qcm_id, item_id }))?;
        match item {
            ItemEvaluation::ChoixMultiple(question) => Ok(question.est_bonne_reponse(selection)),
            ItemEvaluation::Ouverte(_) => Err(AppError::Other(format!(
                "l'item {} est une question ouverte, pas un choix multiple",
                item_id
            ))),
        }
    }

    /// Note une réponse ouverte contre son corrigé type
    pub fn noter_reponse_ouverte(
        &self,
        question: &QuestionOuverte,
        reponse_etudiant: &str,
    ) -> AppResult<ScoreSimilarite> {
        self.grader
            .noter(reponse_etudiant, &question.reponse_attendue, &question.mots_cles)
    }

    /// Résultats publiés pour un QCM
    pub fn resultats(&self, qcm_id: u64) -> Vec<Resultat> {
        self.store.resultats(qcm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{GeneratedQuestion, Langue, Provenance};
    use crate::workflow::store::InMemoryStore;

    fn item(bonne_reponse: u8) -> ItemEvaluation {
        ItemEvaluation::ChoixMultiple(
            GeneratedQuestion::new(
                "Question ?".to_string(),
                [
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "d".to_string(),
                ],
                bonne_reponse,
                Provenance {
                    backend: "test".to_string(),
                    langue: Langue::Francais,
                },
            )
            .expect("item de test valide"),
        )
    }

    fn item_ouvert() -> ItemEvaluation {
        ItemEvaluation::Ouverte(QuestionOuverte {
            texte: "Expliquez la photosynthèse.".to_string(),
            reponse_attendue: "La lumière devient énergie chimique.".to_string(),
            mots_cles: vec!["lumière".to_string(), "énergie".to_string()],
            contexte_source: String::new(),
        })
    }

    fn workflow() -> CorrectionWorkflow<InMemoryStore> {
        CorrectionWorkflow::new(InMemoryStore::new(), &Config::default())
    }

    #[test]
    fn notation_d_un_choix() {
        let w = workflow();
        let qcm_id = w.publier_qcm(vec![item(3)]);
        let item_id = *w.store().qcm(qcm_id).unwrap().keys().next().unwrap();
        assert!(w.noter_choix(qcm_id, item_id, 3).unwrap());
        assert!(!w.noter_choix(qcm_id, item_id, 1).unwrap());
        assert!(w.noter_choix(qcm_id, 9999, 1).is_err());
    }

    #[test]
    fn notation_d_un_choix_sur_item_ouvert_refusee() {
        let w = workflow();
        let qcm_id = w.publier_qcm(vec![item_ouvert()]);
        let item_id = *w.store().qcm(qcm_id).unwrap().keys().next().unwrap();
        assert!(w.noter_choix(qcm_id, item_id, 1).is_err());
    }

    #[test]
    fn soumission_depuis_payload_json() {
        let w = workflow();
        let qcm_id = w.publier_qcm(vec![item(1)]);
        let item_id = *w.store().qcm(qcm_id).unwrap().keys().next().unwrap();

        let payload = format!(r#"{{"{}": 1}}"#, item_id);
        assert!(w.soumettre_json(10, qcm_id, &payload).is_ok());
        assert!(w.soumettre_json(11, qcm_id, "pas du JSON").is_err());
    }

    #[test]
    fn cycle_complet_soumission_correction() {
        let w = workflow();
        let qcm_id = w.publier_qcm(vec![item(2), item(4)]);
        let ids: Vec<u64> = w.store().qcm(qcm_id).unwrap().keys().copied().collect();

        let mut reponses = BTreeMap::new();
        reponses.insert(ids[0], Reponse::Choix(2));
        reponses.insert(ids[1], Reponse::Choix(1));
        w.soumettre(5, qcm_id, reponses).unwrap();

        let resume = w.corriger_qcm(qcm_id).unwrap();
        assert_eq!(resume.soumissions_corrigees, 1);
        assert!((resume.note_moyenne - 10.0).abs() < f64::EPSILON);

        assert!(w.corriger_qcm(qcm_id).is_err());

        let resultats = w.resultats(qcm_id);
        assert_eq!(resultats.len(), 1);
        assert_eq!(resultats[0].score, 1);
    }

    #[test]
    fn item_ouvert_sans_reponse_note_zero() {
        // Une réponse ouverte absente court-circuite le modèle d'embeddings
        let w = workflow();
        let qcm_id = w.publier_qcm(vec![item(1), item_ouvert()]);
        let ids: Vec<u64> = w.store().qcm(qcm_id).unwrap().keys().copied().collect();

        let mut reponses = BTreeMap::new();
        reponses.insert(ids[0], Reponse::Choix(1));
        w.soumettre(5, qcm_id, reponses).unwrap();
        w.corriger_qcm(qcm_id).unwrap();

        let resultat = &w.resultats(qcm_id)[0];
        assert_eq!(resultat.score, 1);
        assert_eq!(resultat.total, 2);
        assert!((resultat.pourcentage - 50.0).abs() < f64::EPSILON);
        let ouvert = resultat
            .details
            .iter()
            .find(|d| d.bonne_reponse.is_none())
            .unwrap();
        assert!(!ouvert.correcte);
        assert_eq!(ouvert.points, 0.0);
        assert!(ouvert.feedback.is_some());
    }

    #[test]
    fn feedback_de_note_par_paliers() {
        let f = formater_feedback_note(12.0, 60.0);
        assert!(f.starts_with("📊 Note obtenue : 12.00/20 (60.0%)"));
        assert!(f.contains("Travail correct"));
        assert!(formater_feedback_note(18.0, 90.0).contains("Excellent"));
        assert!(formater_feedback_note(4.0, 20.0).contains("très insuffisant"));
    }

    #[test]
    fn correction_pure_item_manquant() {
        let items: BTreeMap<u64, ItemEvaluation> =
            [(1_u64, item(1)), (2_u64, item(2))].into_iter().collect();
        let soumission = Soumission::new(
            1,
            1,
            1,
            [(1_u64, Reponse::Choix(1))].into_iter().collect(),
        )
        .unwrap();
        // Sans item ouvert, le noteur n'est jamais sollicité
        let grader = SimilarityGrader::new(&Config::default());
        let (score, points, details) =
            corriger_soumission(&items, &soumission, &grader).unwrap();
        assert_eq!(score, 1);
        assert!((points - 1.0).abs() < f64::EPSILON);
        assert_eq!(details.len(), 2);
        assert!(details[1].selection.is_none());
        assert!(!details[1].correcte);
    }
}
