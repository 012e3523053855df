//! Application de démonstration pilotée par fichiers de jobs
//!
//! Charge les jobs TOML du dossier configuré, génère pour chacun un QCM
//! complet (items à choix multiple, vrai/faux, questions ouvertes), le
//! publie dans le store et affiche un rapport.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::loaders::toml_loader::{self, GenerationJob};
use crate::models::question::ItemEvaluation;
use crate::services::generation_service::resoudre_document_source;
use crate::services::GenerationService;
use crate::utils::logging;
use crate::workflow::{CorrectionWorkflow, InMemoryStore};

/// Structure principale de l'application
pub struct App {
    config: Config,
    generation: GenerationService,
    workflow: CorrectionWorkflow<InMemoryStore>,
}

impl App {
    /// Initialise l'application
    pub fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config.jobs_folder);

        let generation = GenerationService::depuis_config(&config);
        let workflow = CorrectionWorkflow::new(InMemoryStore::new(), &config);

        Ok(Self {
            config,
            generation,
            workflow,
        })
    }

    /// Boucle principale: un passage sur tous les jobs du dossier
    pub async fn run(&self) -> Result<()> {
        let jobs = toml_loader::load_all_toml_files(&self.config.jobs_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ aucun job TOML trouvé, arrêt");
            return Ok(());
        }

        let total = jobs.len();
        logging::log_jobs_loaded(total);

        let mut reussis = 0;
        let mut echoues = 0;
        for (i, job) in jobs.iter().enumerate() {
            logging::log_job_start(i + 1, total, &job.matiere, &job.niveau);
            match self.traiter_job(job).await {
                Ok(()) => reussis += 1,
                Err(e) => {
                    error!("❌ job {} en échec: {}", i + 1, e);
                    echoues += 1;
                }
            }
        }

        logging::print_final_stats(reussis, echoues, total, &self.config.output_log_file);
        Ok(())
    }

    async fn traiter_job(&self, job: &GenerationJob) -> Result<()> {
        // Sans texte source, l'entrée libre `sujet` alimente la génération
        let texte_source = match &job.sujet {
            Some(sujet) if job.texte_source.is_none() && job.fichier_source.is_none() => {
                resoudre_document_source(sujet, &job.matiere, &job.niveau, job.contexte.as_deref())
            }
            _ => job.resoudre_texte_source().await?,
        };
        let request = job.to_request();

        let questions = self.generation.generer_qcm(&texte_source, &request).await?;
        if questions.is_empty() {
            anyhow::bail!("aucun item QCM produit pour ce job");
        }

        let vrai_faux = self
            .generation
            .generer_vrai_faux(&texte_source, request.difficulte, 3)
            .await?;
        let ouvertes = self
            .generation
            .generer_questions_ouvertes(&texte_source, request.difficulte, 2)
            .await?;

        // La banque publiée mélange choix multiples et questions ouvertes,
        // les deux sont corrigés par la correction en masse
        let mut items: Vec<ItemEvaluation> = questions
            .iter()
            .cloned()
            .map(ItemEvaluation::ChoixMultiple)
            .collect();
        items.extend(ouvertes.iter().cloned().map(ItemEvaluation::Ouverte));
        let qcm_id = self.workflow.publier_qcm(items);
        info!(
            "✅ QCM {} publié: {} choix multiples, {} question(s) ouverte(s)",
            qcm_id,
            questions.len(),
            ouvertes.len()
        );
        for (n, q) in questions.iter().enumerate() {
            info!(
                "  {}. {} (réponse {}{})",
                n + 1,
                logging::truncate_text(&q.texte, 70),
                q.bonne_reponse,
                if q.low_confidence { ", à relire" } else { "" }
            );
        }
        for (n, q) in ouvertes.iter().enumerate() {
            info!(
                "  {}. {} (ouverte)",
                questions.len() + n + 1,
                logging::truncate_text(&q.texte, 70)
            );
        }
        info!("  + {} affirmation(s) vrai/faux", vrai_faux.len());

        Ok(())
    }
}
