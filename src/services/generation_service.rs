//! Orchestration de la génération d'évaluations
//!
//! Enchaîne découpage du texte source, extraction de concepts, construction
//! du prompt, cascade de modèles et traduction. Un chunk qui ne donne rien
//! est un manque, pas une erreur: le service produit ce qu'il peut et
//! journalise l'écart entre demandé et obtenu.

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::generation::backend::{BackendKind, GenerationBackend};
use crate::generation::cascade::ModelCascade;
use crate::generation::chunker::decouper_texte;
use crate::generation::concepts::{
    detecter_type_contenu, detecter_type_sujet, extraire_concepts_cles, TypeSujet,
};
use crate::generation::parser::{parser_question_ouverte, parser_vrai_faux};
use crate::generation::prompt::{
    construire_prompt_qcm, construire_prompt_question_ouverte, construire_prompt_vrai_faux,
};
use crate::generation::translate::TranslationStage;
use crate::models::question::{
    GeneratedQuestion, GenerationRequest, Langue, Provenance, QuestionOuverte, VraiFaux,
};

/// Affirmations de secours quand la génération Vrai/Faux reste en déficit
const VRAI_FAUX_SECOURS: &[(&str, bool)] = &[
    ("Le texte étudié développe son sujet principal en plusieurs points.", true),
    ("Le texte étudié ne contient aucune information sur son sujet.", false),
    ("Les notions abordées dans le texte sont liées entre elles.", true),
];

/// Question ouverte de secours construite sur les concepts du chunk
///
/// Le corrigé type est le début du chunk lui-même, les mots-clés ses
/// concepts extraits.
fn question_ouverte_secours(chunk: &crate::models::question::SourceChunk, tour: usize) -> QuestionOuverte {
    let concepts = extraire_concepts_cles(&chunk.texte, 5);
    let concept = concepts
        .first()
        .cloned()
        .unwrap_or_else(|| "ce sujet".to_string());
    let texte = match tour % 3 {
        0 => format!("Expliquez en détail {}.", concept),
        1 => format!("Quels sont les principaux aspects de {} ?", concept),
        _ => format!("Décrivez le rôle et l'importance de {}.", concept),
    };
    QuestionOuverte {
        texte,
        reponse_attendue: chunk.texte.chars().take(300).collect(),
        mots_cles: concepts,
        contexte_source: chunk.texte.clone(),
    }
}

/// Résout le document source depuis l'entrée libre de l'enseignant
///
/// Un contexte explicite est prioritaire. Sinon l'entrée est classée: une
/// consigne ou un contenu de cours servent tels quels, un sujet court est
/// développé en document structuré pour donner matière aux modèles.
pub fn resoudre_document_source(
    sujet: &str,
    matiere: &str,
    niveau: &str,
    contexte: Option<&str>,
) -> String {
    if let Some(contexte) = contexte {
        info!("utilisation du contexte fourni");
        return contexte.to_string();
    }

    match detecter_type_sujet(sujet) {
        TypeSujet::PromptInstruction => {
            info!("entrée détectée comme prompt d'instruction");
            sujet.to_string()
        }
        TypeSujet::ContenuCours => {
            info!("entrée détectée comme contenu de cours");
            sujet.to_string()
        }
        TypeSujet::SujetCourt => {
            info!("sujet court détecté, création d'un document de contexte");
            format!(
                "Cours sur {sujet} en {matiere} pour le niveau {niveau}.\n\n\
                 Ce cours couvre les aspects principaux de {sujet}, incluant les \
                 concepts fondamentaux, les applications pratiques et des exemples \
                 concrets. Les étudiants doivent comprendre les principes de base \
                 et savoir les appliquer dans différents contextes.\n\n\
                 Thèmes à maîtriser :\n\
                 - Définitions et concepts clés de {sujet}\n\
                 - Applications pratiques et exemples\n\
                 - Méthodologie et bonnes pratiques\n\
                 - Cas d'usage courants"
            )
        }
    }
}

pub struct GenerationService<B = BackendKind> {
    cascade: ModelCascade<B>,
    traduction: Option<TranslationStage>,
    max_chunk_len: usize,
}

impl GenerationService<BackendKind> {
    /// Service complet: cascade standard et traduction activée
    pub fn depuis_config(config: &Config) -> Self {
        Self {
            cascade: ModelCascade::depuis_config(config),
            traduction: Some(TranslationStage::new(config)),
            max_chunk_len: config.max_chunk_len,
        }
    }
}

impl<B: GenerationBackend> GenerationService<B> {
    pub fn new(
        cascade: ModelCascade<B>,
        traduction: Option<TranslationStage>,
        max_chunk_len: usize,
    ) -> Self {
        Self {
            cascade,
            traduction,
            max_chunk_len,
        }
    }

    fn chunks_ou_erreur(&self, texte_source: &str) -> AppResult<Vec<crate::models::question::SourceChunk>> {
        let chunks = decouper_texte(texte_source, self.max_chunk_len);
        if chunks.iter().all(|c| c.texte.is_empty()) {
            return Err(AppError::Other(
                "texte source vide, rien à générer".to_string(),
            ));
        }
        Ok(chunks)
    }

    /// Génère un QCM complet depuis un texte source
    ///
    /// Retourne au plus `request.nombre` items valides, dédupliqués par
    /// texte de question.
    pub async fn generer_qcm(
        &self,
        texte_source: &str,
        request: &GenerationRequest,
    ) -> AppResult<Vec<GeneratedQuestion>> {
        let chunks = self.chunks_ou_erreur(texte_source)?;
        let type_contenu = detecter_type_contenu(texte_source);
        info!(
            "génération QCM: {} items demandés, {} chunks, contenu {}",
            request.nombre,
            chunks.len(),
            type_contenu.name()
        );

        let mut questions: Vec<GeneratedQuestion> = Vec::new();
        for i in 0..request.nombre {
            let chunk = &chunks[i % chunks.len()];
            let concepts = extraire_concepts_cles(&chunk.texte, 5);
            let prompt = construire_prompt_qcm(
                &chunk.texte,
                &request.matiere,
                request.difficulte,
                type_contenu,
                &concepts,
            );

            let (brut, backend) = match self.cascade.generer_question(&prompt).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("chunk {} sans item exploitable: {}", chunk.index, e);
                    continue;
                }
            };

            if questions.iter().any(|q| q.texte == brut.question) {
                warn!("question en doublon ignorée: {}", brut.question);
                continue;
            }

            let provenance = Provenance {
                backend,
                langue: Langue::Anglais,
            };
            let Some(mut question) = GeneratedQuestion::new(
                brut.question,
                brut.options,
                brut.bonne_reponse,
                provenance,
            ) else {
                continue;
            };
            if brut.lettre_par_defaut {
                warn!(
                    "lettre de réponse introuvable, 'A' prise par défaut: {}",
                    question.texte
                );
                question = question.with_low_confidence();
            }

            if let Some(traduction) = &self.traduction {
                question = traduction.traduire_question(question).await;
            }
            questions.push(question);
        }

        info!(
            "génération QCM terminée: {} items produits sur {} demandés",
            questions.len(),
            request.nombre
        );
        Ok(questions)
    }

    /// Génère un QCM depuis l'entrée libre de l'enseignant plutôt qu'un
    /// document déjà constitué
    pub async fn generer_qcm_depuis_sujet(
        &self,
        sujet: &str,
        request: &GenerationRequest,
    ) -> AppResult<Vec<GeneratedQuestion>> {
        let document = resoudre_document_source(
            sujet,
            &request.matiere,
            &request.niveau,
            request.contexte.as_deref(),
        );
        self.generer_qcm(&document, request).await
    }

    /// Génère des affirmations Vrai/Faux
    ///
    /// Jusqu'à deux fois plus de candidats sont demandés pour absorber les
    /// sorties inexploitables; le déficit restant est comblé par des
    /// affirmations de secours.
    pub async fn generer_vrai_faux(
        &self,
        texte_source: &str,
        difficulte: crate::models::question::Difficulte,
        nombre: usize,
    ) -> AppResult<Vec<VraiFaux>> {
        let chunks = self.chunks_ou_erreur(texte_source)?;
        let mut affirmations: Vec<VraiFaux> = Vec::new();

        for i in 0..nombre * 2 {
            if affirmations.len() == nombre {
                break;
            }
            let chunk = &chunks[i % chunks.len()];
            let prompt = construire_prompt_vrai_faux(&chunk.texte, difficulte);
            let sortie = match self.cascade.generer(&prompt).await {
                Ok((texte, _)) => texte,
                Err(e) => {
                    warn!("génération vrai/faux échouée sur le chunk {}: {}", chunk.index, e);
                    continue;
                }
            };
            let Some(vf) = parser_vrai_faux(&sortie) else {
                continue;
            };
            if affirmations.iter().any(|a| a.texte == vf.texte) {
                continue;
            }
            let vf = match &self.traduction {
                Some(traduction) => traduction.traduire_vrai_faux(vf).await,
                None => vf,
            };
            affirmations.push(vf);
        }

        if affirmations.len() < nombre {
            let deficit = nombre - affirmations.len();
            warn!(
                "déficit vrai/faux de {} affirmation(s), complément de secours",
                deficit
            );
            for (texte, reponse) in VRAI_FAUX_SECOURS.iter().take(deficit) {
                affirmations.push(VraiFaux {
                    texte: texte.to_string(),
                    reponse_correcte: *reponse,
                    explication: String::new(),
                });
            }
        }

        Ok(affirmations)
    }

    /// Génère des questions ouvertes avec corrigé type et mots-clés
    ///
    /// Le déficit restant est comblé par des questions de secours bâties
    /// sur les concepts des chunks.
    pub async fn generer_questions_ouvertes(
        &self,
        texte_source: &str,
        difficulte: crate::models::question::Difficulte,
        nombre: usize,
    ) -> AppResult<Vec<QuestionOuverte>> {
        let chunks = self.chunks_ou_erreur(texte_source)?;
        let mut questions: Vec<QuestionOuverte> = Vec::new();

        for i in 0..nombre {
            let chunk = &chunks[i % chunks.len()];
            let prompt = construire_prompt_question_ouverte(&chunk.texte, difficulte);
            let sortie = match self.cascade.generer(&prompt).await {
                Ok((texte, _)) => texte,
                Err(e) => {
                    warn!(
                        "génération de question ouverte échouée sur le chunk {}: {}",
                        chunk.index, e
                    );
                    continue;
                }
            };
            let Some(q) = parser_question_ouverte(&sortie, &chunk.texte) else {
                warn!("sortie de question ouverte inexploitable sur le chunk {}", chunk.index);
                continue;
            };
            let q = match &self.traduction {
                Some(traduction) => traduction.traduire_question_ouverte(q).await,
                None => q,
            };
            questions.push(q);
        }

        if questions.len() < nombre {
            let deficit = nombre - questions.len();
            warn!(
                "déficit de {} question(s) ouverte(s), complément de secours",
                deficit
            );
            for i in 0..deficit {
                let chunk = &chunks[i % chunks.len()];
                questions.push(question_ouverte_secours(chunk, i));
            }
        }

        info!(
            "questions ouvertes: {} produites sur {} demandées",
            questions.len(),
            nombre
        );
        Ok(questions)
    }
}
