//! Correction des réponses ouvertes par similarité sémantique
//!
//! Le score composite combine la similarité sémantique (embeddings locaux)
//! et la couverture des mots-clés attendus. Le modèle d'embeddings est
//! chargé une seule fois par processus, à la première correction, sous le
//! mutex qui sérialise aussi les calculs.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, GradingError};
use crate::models::submission::ScoreSimilarite;

/// Seuil de validation d'une réponse ouverte
pub const SEUIL_VALIDATION: f64 = 0.6;

const POIDS_SEMANTIQUE: f64 = 0.7;
const POIDS_MOTS_CLES: f64 = 0.3;

// L'initialisation se fait verrou tenu: deux premiers appels concurrents ne
// chargent jamais deux moteurs
static MOTEUR: Mutex<Option<TextEmbedding>> = Mutex::new(None);

/// Similarité cosinus ramenée dans [0, 1]
pub fn similarite_cosinus(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let produit: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norme_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norme_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norme_a == 0.0 || norme_b == 0.0 {
        return 0.0;
    }
    (produit / (norme_a * norme_b)).clamp(0.0, 1.0)
}

/// Couverture des mots-clés: part des mots attendus présents dans la
/// réponse, avec la liste des manquants
pub fn couverture_mots_cles(reponse: &str, mots_cles: &[String]) -> (f64, Vec<String>) {
    if mots_cles.is_empty() {
        return (0.0, Vec::new());
    }
    let reponse = reponse.to_lowercase();
    let manquants: Vec<String> = mots_cles
        .iter()
        .filter(|mot| !reponse.contains(&mot.to_lowercase()))
        .cloned()
        .collect();
    let presents = mots_cles.len() - manquants.len();
    (presents as f64 / mots_cles.len() as f64, manquants)
}

/// Score composite: pondération sémantique/mots-clés, ou similarité seule
/// quand aucun mot-clé n'est fourni
pub fn score_composite(semantique: f64, couverture: f64, avec_mots_cles: bool) -> f64 {
    if avec_mots_cles {
        POIDS_SEMANTIQUE * semantique + POIDS_MOTS_CLES * couverture
    } else {
        semantique
    }
}

/// Feedback français par paliers, avec indications de longueur et rappel
/// des mots-clés manquants
pub fn generer_feedback(
    score: f64,
    reponse_etudiant: &str,
    reponse_attendue: &str,
    manquants: &[String],
) -> String {
    let mut feedback = if score >= 0.9 {
        "Excellente réponse, très complète et précise.".to_string()
    } else if score >= 0.75 {
        "Très bonne réponse, l'essentiel y est.".to_string()
    } else if score >= SEUIL_VALIDATION {
        "Bonne réponse, quelques éléments pourraient être précisés.".to_string()
    } else if score >= 0.4 {
        "Réponse partielle, des notions importantes manquent.".to_string()
    } else {
        "Réponse insuffisante, revoyez cette notion.".to_string()
    };

    let longueur = reponse_etudiant.chars().count();
    let attendue = reponse_attendue.chars().count();
    if attendue > 0 {
        if longueur * 2 < attendue {
            feedback.push_str(" Développez davantage votre réponse.");
        } else if longueur > attendue * 2 {
            feedback.push_str(" Essayez d'être plus concis.");
        }
    }

    if !manquants.is_empty() {
        feedback.push_str(&format!(
            " Pensez à aborder: {}.",
            manquants.join(", ")
        ));
    }

    feedback
}

/// Notation d'une réponse ouverte contre son corrigé type
///
/// Couture du workflow de correction: la correction en masse ne dépend que
/// de ce trait, les tests lui substituent un noteur déterministe.
pub trait NoteurReponseOuverte {
    fn noter(
        &self,
        reponse_etudiant: &str,
        reponse_attendue: &str,
        mots_cles: &[String],
    ) -> AppResult<ScoreSimilarite>;
}

/// Correcteur de réponses ouvertes
pub struct SimilarityGrader {
    cache_dir: String,
}

impl SimilarityGrader {
    pub fn new(config: &Config) -> Self {
        Self {
            cache_dir: config.embedding_cache_dir.clone(),
        }
    }

    fn embeddings(&self, textes: Vec<&str>) -> AppResult<Vec<Vec<f32>>> {
        let mut moteur = MOTEUR
            .lock()
            .map_err(|_| AppError::Other("mutex du moteur d'embeddings empoisonné".to_string()))?;
        if moteur.is_none() {
            info!("chargement du modèle d'embeddings (premier appel)");
            let options = TextInitOptions::new(EmbeddingModel::ParaphraseMLMiniLML12V2)
                .with_cache_dir(self.cache_dir.clone().into());
            let engine = TextEmbedding::try_new(options).map_err(|e| {
                AppError::Grading(GradingError::EmbeddingInitFailed { source: e.into() })
            })?;
            *moteur = Some(engine);
        }
        let engine = moteur
            .as_mut()
            .ok_or_else(|| AppError::Other("moteur d'embeddings indisponible".to_string()))?;
        engine
            .embed(textes, None)
            .map_err(|e| AppError::Grading(GradingError::EmbeddingFailed { source: e.into() }))
    }

    /// Note une réponse ouverte contre le corrigé type
    ///
    /// Une réponse vide est notée zéro sans appel au modèle.
    pub fn noter(
        &self,
        reponse_etudiant: &str,
        reponse_attendue: &str,
        mots_cles: &[String],
    ) -> AppResult<ScoreSimilarite> {
        let reponse_etudiant = reponse_etudiant.trim();
        if reponse_etudiant.is_empty() {
            let (_, manquants) = couverture_mots_cles("", mots_cles);
            return Ok(ScoreSimilarite {
                score_semantique: 0.0,
                couverture_mots_cles: 0.0,
                score_final: 0.0,
                est_correcte: false,
                feedback: "Aucune réponse fournie.".to_string(),
                mots_cles_trouves: Vec::new(),
                mots_cles_manquants: manquants,
            });
        }

        let vecteurs = self.embeddings(vec![reponse_etudiant, reponse_attendue])?;
        let score_semantique = similarite_cosinus(&vecteurs[0], &vecteurs[1]);
        let (couverture, manquants) = couverture_mots_cles(reponse_etudiant, mots_cles);
        let trouves: Vec<String> = mots_cles
            .iter()
            .cloned()
            .filter(|mot| !manquants.contains(mot))
            .collect();
        let score_final = score_composite(score_semantique, couverture, !mots_cles.is_empty());

        debug!(
            "similarité sémantique {:.3}, couverture {:.3}, score final {:.3}",
            score_semantique, couverture, score_final
        );

        Ok(ScoreSimilarite {
            score_semantique,
            couverture_mots_cles: couverture,
            score_final,
            est_correcte: score_final >= SEUIL_VALIDATION,
            feedback: generer_feedback(
                score_final,
                reponse_etudiant,
                reponse_attendue,
                &manquants,
            ),
            mots_cles_trouves: trouves,
            mots_cles_manquants: manquants,
        })
    }
}

impl NoteurReponseOuverte for SimilarityGrader {
    fn noter(
        &self,
        reponse_etudiant: &str,
        reponse_attendue: &str,
        mots_cles: &[String],
    ) -> AppResult<ScoreSimilarite> {
        SimilarityGrader::noter(self, reponse_etudiant, reponse_attendue, mots_cles)
    }
}
