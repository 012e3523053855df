use crate::error::AppError;
use crate::models::question::{Difficulte, GenerationRequest};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Job de génération décrit en TOML
///
/// Le texte source est soit inline (`texte_source`), soit un chemin de
/// fichier (`fichier_source`). À défaut, un `sujet` libre (sujet court,
/// contenu de cours ou consigne) peut alimenter la génération.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationJob {
    pub matiere: String,
    pub niveau: String,
    /// "facile" | "moyen" | "difficile", moyen par défaut
    #[serde(default)]
    pub difficulte: Option<String>,
    /// Nombre de questions souhaité
    #[serde(default = "default_nombre")]
    pub nombre: usize,
    #[serde(default)]
    pub texte_source: Option<String>,
    #[serde(default)]
    pub fichier_source: Option<String>,
    /// Entrée libre de l'enseignant, utilisée sans texte source
    #[serde(default)]
    pub sujet: Option<String>,
    #[serde(default)]
    pub contexte: Option<String>,
    /// Renseigné au chargement
    #[serde(skip)]
    pub file_path: Option<String>,
}

fn default_nombre() -> usize {
    5
}

impl GenerationJob {
    /// Convertit le job en requête de génération validée
    pub fn to_request(&self) -> GenerationRequest {
        let difficulte = self
            .difficulte
            .as_deref()
            .and_then(Difficulte::find)
            .unwrap_or(Difficulte::Moyen);
        GenerationRequest {
            matiere: self.matiere.clone(),
            niveau: self.niveau.clone(),
            difficulte,
            nombre: self.nombre,
            contexte: self.contexte.clone(),
        }
    }

    /// Résout le texte source: inline prioritaire, sinon lecture du fichier
    pub async fn resoudre_texte_source(&self) -> Result<String> {
        if let Some(texte) = &self.texte_source {
            return Ok(texte.clone());
        }
        if let Some(fichier) = &self.fichier_source {
            if !Path::new(fichier).exists() {
                return Err(AppError::file_not_found(fichier).into());
            }
            let texte = fs::read_to_string(fichier)
                .await
                .map_err(|e| AppError::file_read_failed(fichier, e))
                .with_context(|| format!("impossible de lire le texte source: {}", fichier))?;
            return Ok(texte);
        }
        anyhow::bail!(
            "le job ne fournit ni texte_source, ni fichier_source, ni sujet ({})",
            self.file_path.as_deref().unwrap_or("<inline>")
        );
    }
}

/// Charge un fichier TOML et le convertit en GenerationJob
pub async fn load_toml_to_job(toml_file_path: &Path) -> Result<GenerationJob> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("impossible de lire le fichier TOML: {}", toml_file_path.display()))?;

    let mut job: GenerationJob = toml::from_str(&content)
        .with_context(|| format!("impossible d'analyser le fichier TOML: {}", toml_file_path.display()))?;

    job.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(job)
}

/// Charge tous les fichiers TOML d'un dossier en jobs de génération
pub async fn load_all_toml_files(folder_path: &str) -> Result<Vec<GenerationJob>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("dossier introuvable: {}", folder_path);
    }

    let mut jobs = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("impossible de lire le dossier: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "chargement de {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_toml_to_job(&path).await {
                Ok(job) => {
                    tracing::info!(
                        "job chargé: {} ({}), {} questions demandées",
                        job.matiere,
                        job.niveau,
                        job.nombre
                    );
                    jobs.push(job);
                }
                Err(e) => {
                    tracing::warn!("échec de chargement {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_minimal_vers_requete() {
        let job: GenerationJob = toml::from_str(
            r#"
            matiere = "Histoire"
            niveau = "Terminale"
            texte_source = "La Révolution française débute en 1789."
            "#,
        )
        .unwrap();
        let req = job.to_request();
        assert_eq!(req.matiere, "Histoire");
        assert_eq!(req.nombre, 5);
        assert_eq!(req.difficulte, Difficulte::Moyen);
    }

    #[test]
    fn difficulte_explicite() {
        let job: GenerationJob = toml::from_str(
            r#"
            matiere = "Maths"
            niveau = "Seconde"
            difficulte = "difficile"
            nombre = 3
            texte_source = "Le théorème de Pythagore."
            "#,
        )
        .unwrap();
        let req = job.to_request();
        assert_eq!(req.difficulte, Difficulte::Difficile);
        assert_eq!(req.nombre, 3);
    }

    #[tokio::test]
    async fn texte_source_inline_prioritaire() {
        let job: GenerationJob = toml::from_str(
            r#"
            matiere = "SVT"
            niveau = "Première"
            texte_source = "La photosynthèse."
            fichier_source = "/chemin/inexistant.txt"
            "#,
        )
        .unwrap();
        let texte = job.resoudre_texte_source().await.unwrap();
        assert_eq!(texte, "La photosynthèse.");
    }

    #[tokio::test]
    async fn job_sans_source_refuse() {
        let job: GenerationJob = toml::from_str(
            r#"
            matiere = "SVT"
            niveau = "Première"
            "#,
        )
        .unwrap();
        assert!(job.resoudre_texte_source().await.is_err());
    }

    #[test]
    fn job_avec_sujet_seul() {
        let job: GenerationJob = toml::from_str(
            r#"
            matiere = "Maths"
            niveau = "Sixième"
            sujet = "Les fractions"
            "#,
        )
        .unwrap();
        assert_eq!(job.sujet.as_deref(), Some("Les fractions"));
        assert!(job.texte_source.is_none());
    }
}
