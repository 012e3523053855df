use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::question::{GeneratedQuestion, Langue, QuestionOuverte, VraiFaux};

/// Étape de traduction anglais → français
///
/// La traduction est un confort, jamais un point de défaillance: chaque
/// champ est traduit indépendamment et conserve son texte anglais si l'appel
/// échoue. La langue de provenance n'est marquée française que si le texte
/// de la question a bien été traduit.
pub struct TranslationStage {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl TranslationStage {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/{}",
                config.hf_api_base_url.trim_end_matches('/'),
                config.translation_model
            ),
            token: config.hf_api_token.clone(),
            timeout: Duration::from_secs(config.backend_timeout_secs),
        }
    }

    fn extraire_traduction(valeur: &serde_json::Value) -> Option<String> {
        let objet = match valeur {
            serde_json::Value::Array(items) => items.first()?,
            autre => autre,
        };
        objet
            .get("translation_text")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    async fn traduire(&self, texte: &str) -> AppResult<String> {
        let reponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": texte }))
            .timeout(self.timeout)
            .send()
            .await?;

        let statut = reponse.status();
        if !statut.is_success() {
            return Err(AppError::api_bad_status(
                self.endpoint.clone(),
                statut.as_u16(),
                None,
            ));
        }

        let valeur: serde_json::Value = reponse.json().await?;
        Self::extraire_traduction(&valeur).ok_or(AppError::Api(
            crate::error::ApiError::EmptyResponse {
                endpoint: self.endpoint.clone(),
            },
        ))
    }

    /// Traduit un champ, conserve l'original en cas d'échec
    pub async fn traduire_ou_conserver(&self, texte: &str) -> String {
        match self.traduire(texte).await {
            Ok(traduit) => traduit,
            Err(e) => {
                warn!("traduction échouée, texte anglais conservé: {}", e);
                texte.to_string()
            }
        }
    }

    /// Traduit un item QCM champ par champ
    pub async fn traduire_question(&self, mut question: GeneratedQuestion) -> GeneratedQuestion {
        debug!("traduction de l'item: {}", question.texte);
        let texte_traduit = self.traduire(&question.texte).await;
        let texte_ok = texte_traduit.is_ok();
        if let Ok(t) = texte_traduit {
            question.texte = t;
        }
        for option in question.reponses.iter_mut() {
            *option = self.traduire_ou_conserver(option).await;
        }
        if texte_ok {
            question.provenance.langue = Langue::Francais;
        }
        question
    }

    /// Traduit une affirmation Vrai/Faux champ par champ
    pub async fn traduire_vrai_faux(&self, mut vf: VraiFaux) -> VraiFaux {
        vf.texte = self.traduire_ou_conserver(&vf.texte).await;
        if !vf.explication.is_empty() {
            vf.explication = self.traduire_ou_conserver(&vf.explication).await;
        }
        vf
    }

    /// Traduit une question ouverte champ par champ, mots-clés compris
    pub async fn traduire_question_ouverte(&self, mut q: QuestionOuverte) -> QuestionOuverte {
        q.texte = self.traduire_ou_conserver(&q.texte).await;
        q.reponse_attendue = self.traduire_ou_conserver(&q.reponse_attendue).await;
        for mot in q.mots_cles.iter_mut() {
            *mot = self.traduire_ou_conserver(mot).await.to_lowercase();
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_traduction_liste_et_objet() {
        let liste = serde_json::json!([{ "translation_text": " Bonjour " }]);
        assert_eq!(
            TranslationStage::extraire_traduction(&liste),
            Some("Bonjour".to_string())
        );
        let objet = serde_json::json!({ "translation_text": "Salut" });
        assert_eq!(
            TranslationStage::extraire_traduction(&objet),
            Some("Salut".to_string())
        );
        assert_eq!(
            TranslationStage::extraire_traduction(&serde_json::json!([])),
            None
        );
        let vide = serde_json::json!([{ "translation_text": "" }]);
        assert_eq!(TranslationStage::extraire_traduction(&vide), None);
    }

    #[tokio::test]
    #[ignore]
    async fn traduction_reelle() {
        let config = Config::from_env();
        let stage = TranslationStage::new(&config);
        let traduit = stage.traduire("What is the capital of France?").await.unwrap();
        assert!(!traduit.is_empty());
        println!("traduction: {}", traduit);
    }
}
