use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::generation::backend::{
    BackendKind, ChatBackend, GenerationBackend, LocalBackend, RemoteBackend,
};
use crate::generation::parser::{parser_qcm, QcmBrut};

/// Cascade de backends, essayés dans l'ordre jusqu'au premier succès
///
/// L'ordre est fixe, du plus capable au plus accessible, et aucun backend
/// n'est appelé deux fois pour une même demande. Tout échec fait passer au
/// suivant sans retentative; un refus d'authentification est journalisé en
/// erreur, les indisponibilités en simple avertissement.
pub struct ModelCascade<B> {
    backends: Vec<B>,
    timeout: Duration,
}

impl ModelCascade<BackendKind> {
    /// Assemble la cascade standard: modèles distants dans l'ordre de la
    /// configuration, backend de chat s'il est configuré, générateur local
    /// en dernier échelon
    pub fn depuis_config(config: &Config) -> Self {
        let mut backends: Vec<BackendKind> = config
            .remote_models
            .iter()
            .map(|m| BackendKind::Remote(RemoteBackend::new(config, m)))
            .collect();
        if config.chat_backend_enabled() {
            backends.push(BackendKind::Chat(ChatBackend::new(config)));
        }
        backends.push(BackendKind::Local(LocalBackend::new()));
        Self::new(backends, Duration::from_secs(config.backend_timeout_secs))
    }
}

impl<B: GenerationBackend> ModelCascade<B> {
    pub fn new(backends: Vec<B>, timeout: Duration) -> Self {
        Self { backends, timeout }
    }

    /// Génère du texte brut: retourne la sortie du premier backend qui
    /// répond, avec le nom du backend
    pub async fn generer(&self, prompt: &str) -> AppResult<(String, String)> {
        for backend in &self.backends {
            match tokio::time::timeout(self.timeout, backend.generer(prompt)).await {
                Ok(Ok(texte)) => {
                    info!("génération réussie via {}", backend.name());
                    return Ok((texte, backend.name().to_string()));
                }
                Ok(Err(echec)) => {
                    if echec.est_refus_auth() {
                        error!("{}, passage au suivant", echec);
                    } else {
                        warn!("échec de {}, passage au suivant: {}", backend.name(), echec);
                    }
                }
                Err(_) => {
                    warn!(
                        "timeout de {} après {:?}, passage au suivant",
                        backend.name(),
                        self.timeout
                    );
                }
            }
        }
        Err(AppError::Other(
            "tous les backends de génération ont échoué".to_string(),
        ))
    }

    /// Génère puis parse un item QCM: une sortie qui ne se parse pas vaut
    /// échec de backend et fait passer au suivant
    pub async fn generer_question(&self, prompt: &str) -> AppResult<(QcmBrut, String)> {
        for backend in &self.backends {
            let sortie = match tokio::time::timeout(self.timeout, backend.generer(prompt)).await {
                Ok(Ok(texte)) => texte,
                Ok(Err(echec)) => {
                    if echec.est_refus_auth() {
                        error!("{}, passage au suivant", echec);
                    } else {
                        warn!("échec de {}, passage au suivant: {}", backend.name(), echec);
                    }
                    continue;
                }
                Err(_) => {
                    warn!(
                        "timeout de {} après {:?}, passage au suivant",
                        backend.name(),
                        self.timeout
                    );
                    continue;
                }
            };

            match parser_qcm(&sortie) {
                Some(item) => {
                    info!("item QCM obtenu via {}", backend.name());
                    return Ok((item, backend.name().to_string()));
                }
                None => {
                    warn!(
                        "sortie de {} inexploitable, passage au suivant",
                        backend.name()
                    );
                }
            }
        }
        Err(AppError::Other(
            "aucun backend n'a produit d'item QCM exploitable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::backend::BackendFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Comportement {
        Statut(u16),
        Reponse(String),
        Auth,
    }

    struct FakeBackend {
        nom: String,
        comportement: Comportement,
        appels: AtomicUsize,
    }

    impl FakeBackend {
        fn statut(nom: &str, statut: u16) -> Self {
            Self {
                nom: nom.to_string(),
                comportement: Comportement::Statut(statut),
                appels: AtomicUsize::new(0),
            }
        }

        fn reponse(nom: &str, texte: &str) -> Self {
            Self {
                nom: nom.to_string(),
                comportement: Comportement::Reponse(texte.to_string()),
                appels: AtomicUsize::new(0),
            }
        }

        fn auth(nom: &str) -> Self {
            Self {
                nom: nom.to_string(),
                comportement: Comportement::Auth,
                appels: AtomicUsize::new(0),
            }
        }
    }

    impl GenerationBackend for FakeBackend {
        fn name(&self) -> &str {
            &self.nom
        }

        async fn generer(&self, _prompt: &str) -> Result<String, BackendFailure> {
            self.appels.fetch_add(1, Ordering::SeqCst);
            match &self.comportement {
                Comportement::Statut(statut) => Err(BackendFailure::Transient {
                    backend: self.nom.clone(),
                    raison: format!("statut {}", statut),
                }),
                Comportement::Reponse(texte) => Ok(texte.clone()),
                Comportement::Auth => Err(BackendFailure::Auth {
                    backend: self.nom.clone(),
                    statut: 401,
                }),
            }
        }
    }

    const SORTIE_VALIDE: &str = "Q: What is 2+2?A) 3B) 4C) 5D) 6Answer:B";

    #[tokio::test]
    async fn la_cascade_avance_jusqu_au_premier_succes() {
        let backends = vec![
            FakeBackend::statut("a", 503),
            FakeBackend::statut("b", 404),
            FakeBackend::reponse("c", SORTIE_VALIDE),
        ];
        let cascade = ModelCascade::new(backends, Duration::from_secs(5));
        let (texte, nom) = cascade.generer("prompt").await.unwrap();
        assert_eq!(texte, SORTIE_VALIDE);
        assert_eq!(nom, "c");
        // Exactement un appel par backend, dans l'ordre
        for b in &cascade.backends {
            assert_eq!(b.appels.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn le_premier_succes_court_circuite_la_suite() {
        let backends = vec![
            FakeBackend::reponse("a", SORTIE_VALIDE),
            FakeBackend::reponse("b", SORTIE_VALIDE),
        ];
        let cascade = ModelCascade::new(backends, Duration::from_secs(5));
        let (_, nom) = cascade.generer("prompt").await.unwrap();
        assert_eq!(nom, "a");
        assert_eq!(cascade.backends[1].appels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sortie_non_parseable_vaut_echec_de_backend() {
        let backends = vec![
            FakeBackend::reponse("bavard", "Je ne sais pas formater une question."),
            FakeBackend::reponse("propre", SORTIE_VALIDE),
        ];
        let cascade = ModelCascade::new(backends, Duration::from_secs(5));
        let (item, nom) = cascade.generer_question("prompt").await.unwrap();
        assert_eq!(nom, "propre");
        assert_eq!(item.bonne_reponse, 2);
    }

    #[tokio::test]
    async fn refus_auth_passe_au_suivant() {
        let backends = vec![
            FakeBackend::auth("verrouille"),
            FakeBackend::reponse("accessible", SORTIE_VALIDE),
        ];
        let cascade = ModelCascade::new(backends, Duration::from_secs(5));
        let (_, nom) = cascade.generer("prompt").await.unwrap();
        assert_eq!(nom, "accessible");
        assert_eq!(cascade.backends[0].appels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn epuisement_de_la_cascade() {
        let backends = vec![
            FakeBackend::statut("a", 503),
            FakeBackend::statut("b", 500),
        ];
        let cascade = ModelCascade::new(backends, Duration::from_secs(5));
        let resultat = tokio_test::block_on(cascade.generer("prompt"));
        assert!(resultat.is_err());
    }
}
