use std::collections::HashMap;

use phf::{phf_set, Set};

/// Mots vides français et anglais exclus de l'extraction de concepts
static MOTS_VIDES: Set<&'static str> = phf_set! {
    // Français
    "alors", "aucun", "aussi", "autre", "avant", "avec", "avoir", "bien",
    "car", "cela", "cette", "ceux", "chaque", "comme", "comment", "dans",
    "depuis", "donc", "elle", "elles", "encore", "entre", "etait", "etre",
    "était", "être", "faire", "fait", "faut", "leur", "leurs", "lors",
    "mais", "meme", "même", "moins", "notre", "nous", "plus", "pour",
    "quand", "quel", "quelle", "quels", "sans", "selon", "sont", "sous",
    "tous", "tout", "toute", "toutes", "très", "vers", "votre", "vous",
    // Anglais
    "about", "after", "also", "been", "before", "being", "between", "both",
    "could", "does", "during", "each", "from", "have", "having", "into",
    "more", "most", "other", "over", "same", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "under", "very", "were", "what", "when",
    "where", "which", "while", "will", "with", "would", "your",
};

/// Extrait les concepts clés d'un texte par fréquence de mots
///
/// Les mots de moins de 4 lettres et les mots vides (français et anglais)
/// sont ignorés. Retourne au plus `nombre` concepts, du plus fréquent au
/// moins fréquent, ordre d'apparition en cas d'égalité.
pub fn extraire_concepts_cles(texte: &str, nombre: usize) -> Vec<String> {
    let mut frequences: HashMap<String, usize> = HashMap::new();
    let mut premiere_vue: HashMap<String, usize> = HashMap::new();

    for (position, mot) in texte
        .split(|c: char| !c.is_alphanumeric())
        .filter(|m| !m.is_empty())
        .enumerate()
    {
        let mot = mot.to_lowercase();
        if mot.chars().count() < 4 || MOTS_VIDES.contains(mot.as_str()) {
            continue;
        }
        *frequences.entry(mot.clone()).or_insert(0) += 1;
        premiere_vue.entry(mot).or_insert(position);
    }

    let mut classement: Vec<(String, usize)> = frequences.into_iter().collect();
    classement.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| premiere_vue[&a.0].cmp(&premiere_vue[&b.0]))
    });

    classement
        .into_iter()
        .take(nombre)
        .map(|(mot, _)| mot)
        .collect()
}

/// Type de contenu détecté, utilisé pour orienter les prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeContenu {
    Scientifique,
    Historique,
    Litteraire,
    Technique,
    General,
}

impl TypeContenu {
    pub fn name(self) -> &'static str {
        match self {
            TypeContenu::Scientifique => "scientifique",
            TypeContenu::Historique => "historique",
            TypeContenu::Litteraire => "littéraire",
            TypeContenu::Technique => "technique",
            TypeContenu::General => "général",
        }
    }

    /// Qualificatif anglais injecté dans les prompts
    pub fn descripteur(self) -> &'static str {
        match self {
            TypeContenu::Scientifique => "scientific",
            TypeContenu::Historique => "historical",
            TypeContenu::Litteraire => "literary",
            TypeContenu::Technique => "technical",
            TypeContenu::General => "general",
        }
    }
}

const INDICES_SCIENTIFIQUE: &[&str] = &[
    "théorème", "équation", "molécule", "cellule", "atome", "expérience",
    "hypothèse", "théorie", "physique", "chimie", "biologie", "énergie",
];
const INDICES_HISTORIQUE: &[&str] = &[
    "siècle", "guerre", "révolution", "empire", "roi", "traité", "bataille",
    "dynastie", "époque", "monarchie", "république",
];
const INDICES_LITTERAIRE: &[&str] = &[
    "roman", "poème", "auteur", "personnage", "récit", "métaphore",
    "narrateur", "poésie", "théâtre", "oeuvre", "œuvre",
];
const INDICES_TECHNIQUE: &[&str] = &[
    "algorithme", "logiciel", "système", "protocole", "réseau", "serveur",
    "données", "programmation", "machine", "interface",
];

/// Détecte le type de contenu dominant par comptage d'indices lexicaux
pub fn detecter_type_contenu(texte: &str) -> TypeContenu {
    let texte = texte.to_lowercase();
    let compter = |indices: &[&str]| -> usize {
        indices.iter().filter(|i| texte.contains(*i)).count()
    };

    let scores = [
        (TypeContenu::Scientifique, compter(INDICES_SCIENTIFIQUE)),
        (TypeContenu::Historique, compter(INDICES_HISTORIQUE)),
        (TypeContenu::Litteraire, compter(INDICES_LITTERAIRE)),
        (TypeContenu::Technique, compter(INDICES_TECHNIQUE)),
    ];

    scores
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
        .map(|(t, _)| t)
        .unwrap_or(TypeContenu::General)
}

/// Nature de l'entrée libre fournie par l'enseignant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSujet {
    /// Consigne directe, type "Génère 5 questions sur..."
    PromptInstruction,
    /// Contenu de cours, texte long et descriptif
    ContenuCours,
    /// Sujet court à développer en document structuré
    SujetCourt,
}

const MOTS_INSTRUCTION: &[&str] = &[
    "génère", "générer", "crée", "créer", "fabrique", "produis", "question",
    "qcm", "choix multiple", "exercice",
];
const VERBES_INSTRUCTION: &[&str] = &["génère", "générer", "crée", "créer"];
const MOTS_COURS: &[&str] = &[
    "est", "sont", "permet", "utilisé", "définit", "signifie", "exemple",
    "cas", "notamment", "ainsi", "donc", "car", "parce que",
];

/// Classe l'entrée de l'enseignant: consigne, contenu de cours ou sujet court
///
/// Heuristiques lexicales: des verbes de consigne en tête ou en nombre
/// signalent un prompt d'instruction; un texte long, ponctué et descriptif
/// signale un contenu de cours; tout le reste est un sujet court.
pub fn detecter_type_sujet(texte: &str) -> TypeSujet {
    let minuscule = texte.to_lowercase();
    let longueur = texte.chars().count();

    let nb_instruction = MOTS_INSTRUCTION
        .iter()
        .filter(|mot| minuscule.contains(*mot))
        .count();
    let commence_par_verbe = VERBES_INSTRUCTION
        .iter()
        .any(|verbe| minuscule.trim_start().starts_with(verbe));
    if nb_instruction >= 2 || commence_par_verbe {
        return TypeSujet::PromptInstruction;
    }

    let nb_phrases = texte.matches(['.', '!', '?']).count();
    let nb_mots = texte.split_whitespace().count();
    let nb_cours = MOTS_COURS
        .iter()
        .filter(|mot| minuscule.contains(*mot))
        .count();

    if longueur > 100 && nb_phrases >= 2 && nb_cours >= 2 {
        return TypeSujet::ContenuCours;
    }
    if longueur > 80 && nb_mots > 15 && nb_phrases >= 1 && nb_instruction == 0 {
        return TypeSujet::ContenuCours;
    }

    TypeSujet::SujetCourt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_par_frequence() {
        let texte = "La photosynthèse transforme la lumière. La photosynthèse \
                     produit de l'oxygène. La lumière est captée par la chlorophylle.";
        let concepts = extraire_concepts_cles(texte, 3);
        assert_eq!(concepts[0], "photosynthèse");
        assert!(concepts.contains(&"lumière".to_string()));
    }

    #[test]
    fn mots_vides_exclus() {
        let concepts = extraire_concepts_cles("avec pour dans cette alors comme", 5);
        assert!(concepts.is_empty());
    }

    #[test]
    fn mots_courts_exclus() {
        let concepts = extraire_concepts_cles("le la un de et ou si", 5);
        assert!(concepts.is_empty());
    }

    #[test]
    fn limite_respectee() {
        let texte = "alpha beta gamma delta epsilon zeta".replace(' ', " mot ");
        let concepts = extraire_concepts_cles(&texte, 2);
        assert!(concepts.len() <= 2);
    }

    #[test]
    fn detection_scientifique() {
        let texte = "L'expérience valide l'hypothèse sur la molécule d'eau.";
        assert_eq!(detecter_type_contenu(texte), TypeContenu::Scientifique);
    }

    #[test]
    fn detection_historique() {
        let texte = "La révolution renverse la monarchie à la fin du siècle.";
        assert_eq!(detecter_type_contenu(texte), TypeContenu::Historique);
    }

    #[test]
    fn detection_par_defaut() {
        assert_eq!(
            detecter_type_contenu("Un texte sans indices particuliers."),
            TypeContenu::General
        );
    }

    #[test]
    fn sujet_prompt_instruction() {
        assert_eq!(
            detecter_type_sujet("Génère 5 questions sur les fractions"),
            TypeSujet::PromptInstruction
        );
        assert_eq!(
            detecter_type_sujet("Je veux un qcm de dix questions sur Rome"),
            TypeSujet::PromptInstruction
        );
    }

    #[test]
    fn sujet_contenu_cours() {
        let cours = "La photosynthèse est le processus par lequel les plantes \
                     transforment la lumière. Elle permet notamment la production \
                     de glucose. Par exemple, les feuilles captent la lumière.";
        assert_eq!(detecter_type_sujet(cours), TypeSujet::ContenuCours);
    }

    #[test]
    fn sujet_court_par_defaut() {
        assert_eq!(
            detecter_type_sujet("Les variables en Python"),
            TypeSujet::SujetCourt
        );
    }
}
