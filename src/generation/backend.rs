//! Backends de génération
//!
//! Trois familles de backends derrière un même trait:
//! - `RemoteBackend`: API d'inférence hébergée (modèles seq2seq distants)
//! - `ChatBackend`: service compatible OpenAI via `async-openai`
//! - `LocalBackend`: générateur de secours déterministe, dernier échelon
//!
//! Un échec de backend est une valeur (`BackendFailure`), pas une erreur
//! fatale: la cascade passe au backend suivant, sans jamais retenter le
//! même backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::generation::concepts::extraire_concepts_cles;

/// Échec d'un backend de génération
#[derive(Debug, Error)]
pub enum BackendFailure {
    /// Indisponibilité passagère (démarrage à froid, timeout, statut 5xx),
    /// le backend suivant doit être essayé
    #[error("backend {backend} indisponible: {raison}")]
    Transient { backend: String, raison: String },

    /// Authentification refusée, jamais retentée sur ce backend
    #[error("authentification refusée par {backend} (statut {statut})")]
    Auth { backend: String, statut: u16 },

    /// Le backend a répondu mais sa sortie est inexploitable
    #[error("sortie inexploitable de {backend}")]
    SortieInexploitable { backend: String },
}

impl BackendFailure {
    /// Un refus d'authentification se journalise en erreur, pas en simple
    /// avertissement
    pub fn est_refus_auth(&self) -> bool {
        matches!(self, BackendFailure::Auth { .. })
    }
}

/// Capacité de génération de texte, un prompt en entrée, du texte libre en
/// sortie
pub trait GenerationBackend {
    fn name(&self) -> &str;

    async fn generer(&self, prompt: &str) -> Result<String, BackendFailure>;
}

// ========== Backend distant (API d'inférence hébergée) ==========

/// Backend adossé à un modèle seq2seq hébergé
pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
    modele: String,
    token: String,
    timeout: Duration,
}

impl RemoteBackend {
    pub fn new(config: &Config, modele: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/{}", config.hf_api_base_url.trim_end_matches('/'), modele),
            modele: modele.to_string(),
            token: config.hf_api_token.clone(),
            timeout: Duration::from_secs(config.backend_timeout_secs),
        }
    }

    /// Extrait le texte généré du JSON de réponse (liste ou objet)
    fn extraire_texte(valeur: &serde_json::Value) -> Option<String> {
        let objet = match valeur {
            serde_json::Value::Array(items) => items.first()?,
            autre => autre,
        };
        objet
            .get("generated_text")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

impl GenerationBackend for RemoteBackend {
    fn name(&self) -> &str {
        &self.modele
    }

    async fn generer(&self, prompt: &str) -> Result<String, BackendFailure> {
        debug!("appel du modèle distant {}", self.modele);

        let corps = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 256,
                "temperature": 0.7,
                "do_sample": true,
            },
            "options": { "wait_for_model": false },
        });

        let reponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&corps)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let raison = if e.is_timeout() {
                    "timeout".to_string()
                } else {
                    e.to_string()
                };
                BackendFailure::Transient {
                    backend: self.modele.clone(),
                    raison,
                }
            })?;

        let statut = reponse.status().as_u16();
        match statut {
            200 => {}
            503 => {
                // Démarrage à froid du modèle, classique sur l'API hébergée
                return Err(BackendFailure::Transient {
                    backend: self.modele.clone(),
                    raison: "démarrage à froid (503)".to_string(),
                });
            }
            404 => {
                return Err(BackendFailure::Transient {
                    backend: self.modele.clone(),
                    raison: "modèle indisponible (404)".to_string(),
                });
            }
            401 | 403 => {
                return Err(BackendFailure::Auth {
                    backend: self.modele.clone(),
                    statut,
                });
            }
            autre => {
                return Err(BackendFailure::Transient {
                    backend: self.modele.clone(),
                    raison: format!("statut {}", autre),
                });
            }
        }

        let valeur: serde_json::Value =
            reponse.json().await.map_err(|e| BackendFailure::Transient {
                backend: self.modele.clone(),
                raison: format!("JSON illisible: {}", e),
            })?;

        Self::extraire_texte(&valeur).ok_or(BackendFailure::SortieInexploitable {
            backend: self.modele.clone(),
        })
    }
}

// ========== Backend de chat compatible OpenAI ==========

/// Backend adossé à un service de chat compatible OpenAI
pub struct ChatBackend {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl ChatBackend {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.chat_api_key)
            .with_api_base(&config.chat_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.chat_model_name.clone(),
        }
    }

    fn transient(&self, raison: String) -> BackendFailure {
        BackendFailure::Transient {
            backend: self.model_name.clone(),
            raison,
        }
    }
}

impl GenerationBackend for ChatBackend {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generer(&self, prompt: &str) -> Result<String, BackendFailure> {
        debug!("appel du backend de chat, modèle {}", self.model_name);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content("You are an exam author. Follow the requested output format exactly.")
            .build()
            .map_err(|e| self.transient(e.to_string()))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| self.transient(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(512u32)
            .build()
            .map_err(|e| self.transient(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("appel du backend de chat échoué: {}", e);
            self.transient(e.to_string())
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(BackendFailure::SortieInexploitable {
                backend: self.model_name.clone(),
            })
    }
}

// ========== Backend local de secours ==========

const DISTRACTEURS: [&str; 3] = [
    "an unrelated historical event",
    "a concept absent from the passage",
    "a detail contradicted by the text",
];

/// Item prêt à l'emploi de la banque par matière
struct ItemBanque {
    question: &'static str,
    bonne: &'static str,
    distracteurs: [&'static str; 3],
}

static BANQUES: OnceLock<HashMap<&'static str, Vec<ItemBanque>>> = OnceLock::new();

/// Banques d'items par matière reconnue, construites au premier appel
///
/// Les clés sont cherchées en minuscules dans le prompt, qui nomme la
/// matière de l'évaluation.
fn banques() -> &'static HashMap<&'static str, Vec<ItemBanque>> {
    BANQUES.get_or_init(|| {
        let mut m: HashMap<&'static str, Vec<ItemBanque>> = HashMap::new();
        let biologie = vec![
            ItemBanque {
                question: "What do plants produce during photosynthesis?",
                bonne: "Glucose and oxygen",
                distracteurs: ["Nitrogen and helium", "Salt and water vapour", "Carbon and iron"],
            },
            ItemBanque {
                question: "Which organelle carries out photosynthesis?",
                bonne: "The chloroplast",
                distracteurs: ["The nucleus", "The mitochondrion", "The ribosome"],
            },
        ];
        m.insert("biolog", biologie);
        m.insert(
            "svt",
            vec![
                ItemBanque {
                    question: "Which molecule carries genetic information in a cell?",
                    bonne: "DNA",
                    distracteurs: ["Glucose", "Hemoglobin", "Cellulose"],
                },
                ItemBanque {
                    question: "Which gas do plants absorb for photosynthesis?",
                    bonne: "Carbon dioxide",
                    distracteurs: ["Oxygen", "Nitrogen", "Methane"],
                },
                ItemBanque {
                    question: "Which part of the cell produces most of its energy?",
                    bonne: "The mitochondrion",
                    distracteurs: ["The cell wall", "The vacuole", "The nucleus"],
                },
            ],
        );
        m.insert(
            "histoire",
            vec![
                ItemBanque {
                    question: "In which year did the French Revolution begin?",
                    bonne: "1789",
                    distracteurs: ["1756", "1815", "1848"],
                },
                ItemBanque {
                    question: "Which event marked the end of the First World War?",
                    bonne: "The armistice of November 1918",
                    distracteurs: [
                        "The Treaty of Tordesillas",
                        "The Congress of Vienna",
                        "The fall of Constantinople",
                    ],
                },
            ],
        );
        m.insert(
            "physi",
            vec![ItemBanque {
                question: "What is the SI unit of force?",
                bonne: "The newton",
                distracteurs: ["The joule", "The watt", "The pascal"],
            }],
        );
        m
    })
}

/// Dernier échelon de la cascade: générateur déterministe
///
/// Ne dépend d'aucun service externe et ne peut pas échouer. Quand le
/// prompt nomme une matière reconnue, la question vient de la banque
/// d'items de cette matière; sinon un gabarit reprend le concept dominant
/// du prompt. La sortie suit le format standard, donc passe par le même
/// parseur que les vrais modèles, et la position de la bonne réponse
/// tourne d'un appel à l'autre.
pub struct LocalBackend {
    compteur: AtomicUsize,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            compteur: AtomicUsize::new(0),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationBackend for LocalBackend {
    fn name(&self) -> &str {
        "local-template"
    }

    async fn generer(&self, prompt: &str) -> Result<String, BackendFailure> {
        let tour = self.compteur.fetch_add(1, Ordering::Relaxed);
        let minuscule = prompt.to_lowercase();

        let banque = banques()
            .iter()
            .find(|(matiere, _)| minuscule.contains(*matiere))
            .map(|(_, items)| &items[tour % items.len()]);

        let (question, bonne, distracteurs) = match banque {
            Some(item) => (
                item.question.to_string(),
                item.bonne.to_string(),
                item.distracteurs,
            ),
            None => {
                let concepts = extraire_concepts_cles(prompt, 3);
                let concept = concepts
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "the main idea of the passage".to_string());
                let questions = [
                    "Which concept is central to the passage?",
                    "What does the text mainly discuss?",
                    "Which notion does the passage explain?",
                ];
                (
                    questions[tour % questions.len()].to_string(),
                    concept,
                    DISTRACTEURS,
                )
            }
        };

        // La bonne réponse change de position à chaque appel
        let position = tour % 4;
        let mut options: Vec<String> = Vec::with_capacity(4);
        let mut distracteur = 0;
        for i in 0..4 {
            if i == position {
                options.push(bonne.clone());
            } else {
                options.push(distracteurs[distracteur].to_string());
                distracteur += 1;
            }
        }
        let lettre = (b'A' + position as u8) as char;

        Ok(format!(
            "Q: {}\nA) {}\nB) {}\nC) {}\nD) {}\nAnswer: {}",
            question, options[0], options[1], options[2], options[3], lettre
        ))
    }
}

/// Les trois familles de backends derrière un type unique, pour composer la
/// cascade sans boxing
pub enum BackendKind {
    Remote(RemoteBackend),
    Chat(ChatBackend),
    Local(LocalBackend),
}

impl GenerationBackend for BackendKind {
    fn name(&self) -> &str {
        match self {
            BackendKind::Remote(b) => b.name(),
            BackendKind::Chat(b) => b.name(),
            BackendKind::Local(b) => b.name(),
        }
    }

    async fn generer(&self, prompt: &str) -> Result<String, BackendFailure> {
        match self {
            BackendKind::Remote(b) => b.generer(prompt).await,
            BackendKind::Chat(b) => b.generer(prompt).await,
            BackendKind::Local(b) => b.generer(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::parser::parser_qcm;

    #[test]
    fn extraction_texte_liste_et_objet() {
        let liste = serde_json::json!([{ "generated_text": "  bonjour " }]);
        assert_eq!(
            RemoteBackend::extraire_texte(&liste),
            Some("bonjour".to_string())
        );
        let objet = serde_json::json!({ "generated_text": "salut" });
        assert_eq!(
            RemoteBackend::extraire_texte(&objet),
            Some("salut".to_string())
        );
        let vide = serde_json::json!([{ "generated_text": "   " }]);
        assert_eq!(RemoteBackend::extraire_texte(&vide), None);
        assert_eq!(RemoteBackend::extraire_texte(&serde_json::json!([])), None);
    }

    #[tokio::test]
    async fn backend_local_produit_du_parseable() {
        let backend = LocalBackend::new();
        let sortie = backend
            .generer("Generate a question about photosynthesis and chlorophyll energy.")
            .await
            .unwrap();
        let q = parser_qcm(&sortie).expect("la sortie locale doit être parseable");
        assert!(!q.lettre_par_defaut);
    }

    #[tokio::test]
    async fn backend_local_puise_dans_la_banque_de_matiere() {
        let backend = LocalBackend::new();
        let sortie = backend
            .generer("Generate a beginner-level multiple-choice question for a Biology assessment.")
            .await
            .unwrap();
        let q = parser_qcm(&sortie).unwrap();
        assert_eq!(q.question, "What do plants produce during photosynthesis?");
        assert_eq!(
            q.options[(q.bonne_reponse - 1) as usize],
            "Glucose and oxygen"
        );
    }

    #[tokio::test]
    async fn backend_local_fait_tourner_la_bonne_reponse() {
        let backend = LocalBackend::new();
        let mut positions = Vec::new();
        for _ in 0..4 {
            let sortie = backend.generer("Some text about volcanoes.").await.unwrap();
            let q = parser_qcm(&sortie).unwrap();
            positions.push(q.bonne_reponse);
        }
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn classification_des_echecs() {
        let f = BackendFailure::Auth {
            backend: "m".to_string(),
            statut: 401,
        };
        assert!(f.est_refus_auth());
        let t = BackendFailure::Transient {
            backend: "m".to_string(),
            raison: "503".to_string(),
        };
        assert!(!t.est_refus_auth());
    }
}
