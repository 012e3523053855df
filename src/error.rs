use std::fmt;

/// Type d'erreur de l'application
#[derive(Debug)]
pub enum AppError {
    /// Erreurs d'appel aux API d'inférence
    Api(ApiError),
    /// Erreurs d'accès aux fichiers
    File(FileError),
    /// Erreurs de correction
    Grading(GradingError),
    /// Erreurs du workflow de correction
    Workflow(WorkflowError),
    /// Erreurs de configuration
    Config(ConfigError),
    /// Autres erreurs (encapsulation d'erreurs tierces)
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Api(e) => write!(f, "erreur API: {}", e),
            AppError::File(e) => write!(f, "erreur fichier: {}", e),
            AppError::Grading(e) => write!(f, "erreur de correction: {}", e),
            AppError::Workflow(e) => write!(f, "erreur de workflow: {}", e),
            AppError::Config(e) => write!(f, "erreur de configuration: {}", e),
            AppError::Other(msg) => write!(f, "erreur: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Api(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Grading(e) => Some(e),
            AppError::Workflow(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// Erreurs d'appel aux API d'inférence (génération, traduction)
#[derive(Debug)]
pub enum ApiError {
    /// La requête HTTP a échoué
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// L'API a répondu avec un statut d'erreur
    BadStatus {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// Réponse vide ou sans texte généré
    EmptyResponse {
        endpoint: String,
    },
    /// Échec de désérialisation JSON
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "requête échouée ({}): {}", endpoint, source)
            }
            ApiError::BadStatus {
                endpoint,
                status,
                message,
            } => {
                write!(
                    f,
                    "statut {} renvoyé par {} (message: {:?})",
                    status, endpoint, message
                )
            }
            ApiError::EmptyResponse { endpoint } => {
                write!(f, "réponse vide de {}", endpoint)
            }
            ApiError::JsonParseFailed { source } => {
                write!(f, "échec de désérialisation JSON: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } | ApiError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Erreurs d'accès aux fichiers (jobs TOML, texte source)
#[derive(Debug)]
pub enum FileError {
    /// Fichier introuvable
    NotFound {
        path: String,
    },
    /// Lecture impossible
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Fichier TOML invalide
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "fichier introuvable: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "lecture impossible ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML invalide ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. } | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Erreurs de correction
#[derive(Debug)]
pub enum GradingError {
    /// Le moteur d'embeddings n'a pas pu être initialisé
    EmbeddingInitFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Le calcul d'embedding a échoué
    EmbeddingFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Une réponse référence un item inconnu du QCM
    UnknownItem {
        qcm_id: u64,
        item_id: u64,
    },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::EmbeddingInitFailed { source } => {
                write!(
                    f,
                    "initialisation du modèle d'embeddings échouée: {}",
                    source
                )
            }
            GradingError::EmbeddingFailed { source } => {
                write!(f, "calcul d'embedding échoué: {}", source)
            }
            GradingError::UnknownItem { qcm_id, item_id } => {
                write!(f, "item {} inconnu pour le QCM {}", item_id, qcm_id)
            }
        }
    }
}

impl std::error::Error for GradingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GradingError::EmbeddingInitFailed { source }
            | GradingError::EmbeddingFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Erreurs du workflow de correction
///
/// Les refus de garde (déjà corrigé, déjà soumis) sont des issues normales
/// d'une opération, fatales à l'appel mais pas au processus.
#[derive(Debug)]
pub enum WorkflowError {
    /// Le QCM a déjà été corrigé; la correction est immuable
    AlreadyGraded {
        qcm_id: u64,
    },
    /// L'étudiant a déjà une soumission non retirée pour ce QCM
    AlreadySubmitted {
        etudiant_id: u64,
        qcm_id: u64,
    },
    /// Aucune soumission en attente de correction
    NothingToGrade {
        qcm_id: u64,
    },
    /// Transition de statut invalide
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::AlreadyGraded { qcm_id } => {
                write!(
                    f,
                    "le QCM {} a déjà été corrigé, impossible de le corriger à nouveau",
                    qcm_id
                )
            }
            WorkflowError::AlreadySubmitted { etudiant_id, qcm_id } => {
                write!(
                    f,
                    "l'étudiant {} a déjà soumis le QCM {}, une seule soumission autorisée",
                    etudiant_id, qcm_id
                )
            }
            WorkflowError::NothingToGrade { qcm_id } => {
                write!(f, "aucune soumission en attente pour le QCM {}", qcm_id)
            }
            WorkflowError::InvalidTransition { from, to } => {
                write!(f, "transition de statut invalide: {} → {}", from, to)
            }
        }
    }
}

impl std::error::Error for WorkflowError {}

/// Erreurs de configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Variable d'environnement illisible
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "variable {} invalide: '{}' n'est pas un {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== Conversions depuis les erreurs courantes ==========
// Pas besoin de From<AppError> pour anyhow::Error: anyhow couvre déjà
// tout type implémentant std::error::Error.

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<inconnu>".to_string());
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // l'erreur TOML ne porte pas le chemin
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== Constructeurs de commodité ==========

impl AppError {
    /// Erreur de statut HTTP renvoyé par un backend
    pub fn api_bad_status(
        endpoint: impl Into<String>,
        status: u16,
        message: Option<String>,
    ) -> Self {
        AppError::Api(ApiError::BadStatus {
            endpoint: endpoint.into(),
            status,
            message,
        })
    }

    /// Fichier introuvable
    pub fn file_not_found(path: impl Into<String>) -> Self {
        AppError::File(FileError::NotFound { path: path.into() })
    }

    /// Erreur de lecture de fichier
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// Refus de garde: QCM déjà corrigé
    pub fn already_graded(qcm_id: u64) -> Self {
        AppError::Workflow(WorkflowError::AlreadyGraded { qcm_id })
    }

    /// Refus de garde: soumission en double
    pub fn already_submitted(etudiant_id: u64, qcm_id: u64) -> Self {
        AppError::Workflow(WorkflowError::AlreadySubmitted { etudiant_id, qcm_id })
    }
}

// ========== Alias de résultat ==========

/// Résultat applicatif
pub type AppResult<T> = Result<T, AppError>;
