use crate::error::ConfigError;

/// Lit et parse une variable d'environnement, valeur par défaut en repli
///
/// Une valeur illisible est journalisée puis ignorée, elle ne bloque pas
/// le démarrage.
fn env_parse<T: std::str::FromStr>(var_name: &str, default: T, expected_type: &str) -> T {
    match std::env::var(var_name) {
        Ok(valeur) => match valeur.parse() {
            Ok(parsee) => parsee,
            Err(_) => {
                tracing::warn!(
                    "{}",
                    ConfigError::EnvVarParseFailed {
                        var_name: var_name.to_string(),
                        value: valeur,
                        expected_type: expected_type.to_string(),
                    }
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Configuration du moteur
#[derive(Clone, Debug)]
pub struct Config {
    /// Jeton d'accès à l'API d'inférence hébergée
    pub hf_api_token: String,
    /// Base des endpoints d'inférence hébergés
    pub hf_api_base_url: String,
    /// Modèles distants essayés en cascade, du plus puissant au plus accessible
    pub remote_models: Vec<String>,
    /// Timeout par backend (secondes)
    pub backend_timeout_secs: u64,
    /// Modèle de traduction anglais → français
    pub translation_model: String,
    // --- Backend compatible OpenAI (optionnel) ---
    pub chat_api_key: String,
    pub chat_api_base_url: String,
    pub chat_model_name: String,
    // --- Génération ---
    /// Taille maximale d'un chunk de texte source
    pub max_chunk_len: usize,
    /// Dossier des jobs de génération (fichiers TOML)
    pub jobs_folder: String,
    /// Répertoire de cache du modèle d'embeddings
    pub embedding_cache_dir: String,
    /// Journalisation détaillée
    pub verbose_logging: bool,
    /// Fichier de journal de sortie
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hf_api_token: String::new(),
            hf_api_base_url: "https://api-inference.huggingface.co/models".to_string(),
            remote_models: vec![
                "google/flan-t5-xxl".to_string(),
                "google/flan-t5-xl".to_string(),
                "google/flan-t5-large".to_string(),
            ],
            backend_timeout_secs: 60,
            translation_model: "Helsinki-NLP/opus-mt-en-fr".to_string(),
            chat_api_key: String::new(),
            chat_api_base_url: String::new(),
            chat_model_name: "gpt-4o-mini".to_string(),
            max_chunk_len: 500,
            jobs_folder: "jobs".to_string(),
            embedding_cache_dir: ".cache/fastembed".to_string(),
            verbose_logging: false,
            output_log_file: "correction.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            hf_api_token: std::env::var("HF_API_TOKEN").unwrap_or(default.hf_api_token),
            hf_api_base_url: std::env::var("HF_API_BASE_URL").unwrap_or(default.hf_api_base_url),
            remote_models: std::env::var("REMOTE_MODELS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .unwrap_or(default.remote_models),
            backend_timeout_secs: env_parse(
                "BACKEND_TIMEOUT_SECS",
                default.backend_timeout_secs,
                "entier",
            ),
            translation_model: std::env::var("TRANSLATION_MODEL")
                .unwrap_or(default.translation_model),
            chat_api_key: std::env::var("CHAT_API_KEY").unwrap_or(default.chat_api_key),
            chat_api_base_url: std::env::var("CHAT_API_BASE_URL")
                .unwrap_or(default.chat_api_base_url),
            chat_model_name: std::env::var("CHAT_MODEL_NAME").unwrap_or(default.chat_model_name),
            max_chunk_len: env_parse("MAX_CHUNK_LEN", default.max_chunk_len, "entier"),
            jobs_folder: std::env::var("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            embedding_cache_dir: std::env::var("EMBEDDING_CACHE_DIR")
                .unwrap_or(default.embedding_cache_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging, "booléen"),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// Le backend de chat compatible OpenAI est-il configuré ?
    pub fn chat_backend_enabled(&self) -> bool {
        !self.chat_api_key.is_empty() && !self.chat_api_base_url.is_empty()
    }
}
