//! Stockage des évaluations, soumissions et résultats
//!
//! Un seul mutex couvre tout l'état: chaque opération, garde comprise, est
//! atomique. Deux corrections en masse concurrentes sur le même QCM ne
//! peuvent donc pas passer la garde toutes les deux, la seconde reçoit le
//! refus « déjà corrigé ».

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use tracing::info;

use crate::error::{AppError, AppResult, GradingError, WorkflowError};
use crate::models::question::ItemEvaluation;
use crate::models::submission::{
    GradingSummary, Reponse, Resultat, Soumission, StatutSoumission,
};
use crate::services::grading_service::NoteurReponseOuverte;
use crate::workflow::correction::{corriger_soumission, formater_feedback_note};

/// Frontière de persistance du workflow de correction
pub trait AssessmentStore {
    /// Enregistre la banque d'items d'une évaluation et retourne son
    /// identifiant
    fn creer_qcm(&self, items: Vec<ItemEvaluation>) -> u64;

    /// Items d'un QCM, indexés par identifiant d'item
    fn qcm(&self, qcm_id: u64) -> Option<BTreeMap<u64, ItemEvaluation>>;

    /// Dépose une soumission; refusée si l'étudiant en a déjà une active
    /// pour ce QCM, si une réponse référence un item inconnu ou si sa forme
    /// ne correspond pas à l'item
    fn soumettre(
        &self,
        etudiant_id: u64,
        qcm_id: u64,
        reponses: BTreeMap<u64, Reponse>,
    ) -> AppResult<u64>;

    /// Retire une soumission non corrigée, libérant la garde d'unicité
    fn retirer_soumission(&self, soumission_id: u64) -> AppResult<()>;

    /// Corrige toutes les soumissions en attente d'un QCM, tout ou rien,
    /// réponses ouvertes comprises; refusé si le QCM a déjà des résultats
    fn corriger_en_masse(
        &self,
        qcm_id: u64,
        noteur: &dyn NoteurReponseOuverte,
    ) -> AppResult<GradingSummary>;

    /// Résultats publiés pour un QCM
    fn resultats(&self, qcm_id: u64) -> Vec<Resultat>;

    /// Résultat d'un étudiant pour un QCM
    fn resultat_de(&self, etudiant_id: u64, qcm_id: u64) -> Option<Resultat>;
}

#[derive(Default)]
struct Etat {
    qcms: HashMap<u64, BTreeMap<u64, ItemEvaluation>>,
    soumissions: HashMap<u64, Soumission>,
    resultats: Vec<Resultat>,
    prochain_id: u64,
}

impl Etat {
    fn id_suivant(&mut self) -> u64 {
        self.prochain_id += 1;
        self.prochain_id
    }
}

/// Implémentation en mémoire, un mutex pour tout l'état
#[derive(Default)]
pub struct InMemoryStore {
    etat: Mutex<Etat>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn verrou(&self) -> std::sync::MutexGuard<'_, Etat> {
        // Un thread qui panique verrou tenu invalide l'état de toute façon
        match self.etat.lock() {
            Ok(g) => g,
            Err(empoisonne) => empoisonne.into_inner(),
        }
    }
}

impl AssessmentStore for InMemoryStore {
    fn creer_qcm(&self, items: Vec<ItemEvaluation>) -> u64 {
        let mut etat = self.verrou();
        let qcm_id = etat.id_suivant();
        let mut indexes = BTreeMap::new();
        for item in items {
            let item_id = etat.id_suivant();
            indexes.insert(item_id, item);
        }
        info!("QCM {} créé avec {} items", qcm_id, indexes.len());
        etat.qcms.insert(qcm_id, indexes);
        qcm_id
    }

    fn qcm(&self, qcm_id: u64) -> Option<BTreeMap<u64, ItemEvaluation>> {
        self.verrou().qcms.get(&qcm_id).cloned()
    }

    fn soumettre(
        &self,
        etudiant_id: u64,
        qcm_id: u64,
        reponses: BTreeMap<u64, Reponse>,
    ) -> AppResult<u64> {
        let mut etat = self.verrou();

        let items = etat
            .qcms
            .get(&qcm_id)
            .ok_or_else(|| AppError::Other(format!("QCM {} introuvable", qcm_id)))?;
        for (item_id, reponse) in &reponses {
            match (items.get(item_id), reponse) {
                (None, _) => {
                    return Err(AppError::Grading(GradingError::UnknownItem {
                        qcm_id,
                        item_id: *item_id,
                    }));
                }
                (Some(ItemEvaluation::ChoixMultiple(_)), Reponse::Texte(_)) => {
                    return Err(AppError::Other(format!(
                        "réponse libre fournie pour l'item à choix {}",
                        item_id
                    )));
                }
                (Some(ItemEvaluation::Ouverte(_)), Reponse::Choix(_)) => {
                    return Err(AppError::Other(format!(
                        "option choisie pour l'item ouvert {}",
                        item_id
                    )));
                }
                _ => {}
            }
        }

        let deja = etat
            .soumissions
            .values()
            .any(|s| s.etudiant_id == etudiant_id && s.qcm_id == qcm_id && s.est_active());
        if deja {
            return Err(AppError::already_submitted(etudiant_id, qcm_id));
        }

        let id = etat.id_suivant();
        let soumission = Soumission::new(id, etudiant_id, qcm_id, reponses)?;
        etat.soumissions.insert(id, soumission);
        info!("soumission {} déposée (étudiant {}, QCM {})", id, etudiant_id, qcm_id);
        Ok(id)
    }

    fn retirer_soumission(&self, soumission_id: u64) -> AppResult<()> {
        let mut etat = self.verrou();
        let soumission = etat.soumissions.get_mut(&soumission_id).ok_or_else(|| {
            AppError::Other(format!("soumission {} introuvable", soumission_id))
        })?;
        soumission.transitionner(StatutSoumission::Retiree)
    }

    fn corriger_en_masse(
        &self,
        qcm_id: u64,
        noteur: &dyn NoteurReponseOuverte,
    ) -> AppResult<GradingSummary> {
        // Garde et écriture sous le même verrou
        let mut etat = self.verrou();

        if etat.resultats.iter().any(|r| r.qcm_id == qcm_id) {
            return Err(AppError::already_graded(qcm_id));
        }

        let items = etat
            .qcms
            .get(&qcm_id)
            .ok_or_else(|| AppError::Other(format!("QCM {} introuvable", qcm_id)))?
            .clone();

        let en_attente: Vec<u64> = etat
            .soumissions
            .values()
            .filter(|s| s.qcm_id == qcm_id && s.statut == StatutSoumission::Soumise)
            .map(|s| s.id)
            .collect();
        if en_attente.is_empty() {
            return Err(AppError::Workflow(WorkflowError::NothingToGrade { qcm_id }));
        }

        // Tout ou rien: les résultats ne sont poussés qu'une fois toutes
        // les soumissions corrigées, un échec du noteur n'écrit rien
        let mut nouveaux = Vec::with_capacity(en_attente.len());
        for soumission_id in &en_attente {
            let soumission = &etat.soumissions[soumission_id];
            let (score, points, details) = corriger_soumission(&items, soumission, noteur)?;
            let resultat = Resultat::depuis_points(
                0, // identifiant posé au commit
                soumission.id,
                soumission.etudiant_id,
                qcm_id,
                score,
                items.len() as u32,
                points,
                details,
            );
            let feedback = formater_feedback_note(resultat.note_sur_20, resultat.pourcentage);
            nouveaux.push(resultat.avec_feedback(feedback));
        }

        for soumission_id in &en_attente {
            let soumission = etat
                .soumissions
                .get_mut(soumission_id)
                .ok_or_else(|| AppError::Other("soumission disparue sous verrou".to_string()))?;
            soumission.transitionner(StatutSoumission::EnCorrection)?;
            soumission.transitionner(StatutSoumission::Corrigee)?;
        }

        let notes: Vec<f64> = nouveaux.iter().map(|r| r.note_sur_20).collect();
        let resume = GradingSummary {
            qcm_id,
            soumissions_corrigees: nouveaux.len(),
            note_moyenne: notes.iter().sum::<f64>() / notes.len() as f64,
            note_min: notes.iter().cloned().fold(f64::INFINITY, f64::min),
            note_max: notes.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        };

        for mut resultat in nouveaux {
            resultat.id = etat.id_suivant();
            etat.resultats.push(resultat);
        }

        info!(
            "QCM {} corrigé: {} soumission(s), moyenne {:.1}/20",
            qcm_id, resume.soumissions_corrigees, resume.note_moyenne
        );
        Ok(resume)
    }

    fn resultats(&self, qcm_id: u64) -> Vec<Resultat> {
        self.verrou()
            .resultats
            .iter()
            .filter(|r| r.qcm_id == qcm_id)
            .cloned()
            .collect()
    }

    fn resultat_de(&self, etudiant_id: u64, qcm_id: u64) -> Option<Resultat> {
        self.verrou()
            .resultats
            .iter()
            .find(|r| r.etudiant_id == etudiant_id && r.qcm_id == qcm_id)
            .cloned()
    }
}
