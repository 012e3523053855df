use anyhow::Result;
/// Utilitaires de journalisation
///
/// Aides de formatage et d'écriture du journal de correction
use std::fs;
use tracing::info;

/// Initialise le fichier de journal avec son en-tête daté
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nJournal de génération et de correction - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// Journalise le démarrage du programme
pub fn log_startup(jobs_folder: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 démarrage du moteur de génération d'évaluations");
    info!("📂 dossier des jobs: {}", jobs_folder);
    info!("{}", "=".repeat(60));
}

/// Journalise le chargement des jobs
pub fn log_jobs_loaded(total: usize) {
    info!("✓ {} job(s) de génération trouvé(s)\n", total);
}

/// Journalise le début du traitement d'un job
pub fn log_job_start(num: usize, total: usize, matiere: &str, niveau: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 job {}/{}: {} ({})", num, total, matiere, niveau);
    info!("{}", "=".repeat(60));
}

/// Statistiques finales de la session
pub fn print_final_stats(reussis: usize, echoues: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 session terminée");
    info!(
        "heure de fin: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ jobs réussis: {}/{}", reussis, total);
    info!("❌ jobs échoués: {}", echoues);
    info!("{}", "=".repeat(60));
    info!("\njournal enregistré dans: {}", log_file_path);
}

/// Tronque un texte long pour l'affichage dans les journaux
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn troncature() {
        assert_eq!(truncate_text("bonjour", 10), "bonjour");
        assert_eq!(truncate_text("bonjour tout le monde", 7), "bonjour...");
    }
}
