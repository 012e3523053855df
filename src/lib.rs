//! # qcm-engine
//!
//! Moteur de génération et de correction d'évaluations pédagogiques.
//!
//! ## Architecture
//!
//! Le pipeline suit quatre étages:
//!
//! ### ① Génération (`generation/`)
//! - `chunker` - découpage du texte source en chunks ordonnés
//! - `concepts` - extraction de concepts clés et détection du type de contenu
//! - `prompt` - construction des prompts (QCM, vrai/faux, questions ouvertes)
//! - `backend` / `cascade` - backends de génération essayés en cascade,
//!   du modèle distant le plus capable au générateur local de secours
//! - `parser` - extraction des items depuis les sorties libres des modèles
//! - `translate` - normalisation anglais → français, champ par champ
//!
//! ### ② Services (`services/`)
//! - `GenerationService` - orchestration chunk → prompt → cascade → traduction
//! - `SimilarityGrader` - correction des réponses ouvertes par similarité
//!   sémantique (embeddings locaux) et couverture de mots-clés
//! - `recommendation` - bilan pédagogique agrégé
//!
//! ### ③ Workflow (`workflow/`)
//! - `AssessmentStore` / `InMemoryStore` - état des QCM, soumissions et
//!   résultats derrière un verrou unique
//! - `CorrectionWorkflow` - dépôt des copies et correction en masse,
//!   exactement une fois par QCM
//! - `stats` - statistiques de classe
//!
//! ### ④ Application (`app`)
//! - boucle pilotée par des jobs TOML

pub mod app;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// Réexports des types courants
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::question::{Difficulte, GeneratedQuestion, ItemEvaluation, QuestionOuverte, VraiFaux};
pub use models::submission::{Reponse, Resultat, ScoreSimilarite, Soumission, StatutSoumission};
pub use services::{GenerationService, SimilarityGrader};
pub use workflow::{AssessmentStore, CorrectionWorkflow, InMemoryStore};
