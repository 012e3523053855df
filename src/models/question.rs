use serde::{Deserialize, Serialize};

/// Niveau de difficulté demandé pour la génération
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulte {
    Facile,
    Moyen,
    Difficile,
}

impl Difficulte {
    /// Descripteur de niveau injecté dans les prompts
    pub fn descripteur(self) -> &'static str {
        match self {
            Difficulte::Facile => "beginner-level",
            Difficulte::Moyen => "intermediate-level",
            Difficulte::Difficile => "advanced-level",
        }
    }

    /// Nom affichable
    pub fn name(self) -> &'static str {
        match self {
            Difficulte::Facile => "Facile",
            Difficulte::Moyen => "Moyen",
            Difficulte::Difficile => "Difficile",
        }
    }

    /// Analyse tolérante d'une chaîne (accents et casse ignorés)
    pub fn find(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "facile" | "easy" => Some(Difficulte::Facile),
            "moyen" | "moyenne" | "medium" => Some(Difficulte::Moyen),
            "difficile" | "hard" => Some(Difficulte::Difficile),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Segment ordonné de texte source, immuable une fois découpé
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    /// Indice de séquence dans le document
    pub index: usize,
    pub texte: String,
}

/// Paramètres d'une demande de génération, consommée par appel
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub matiere: String,
    pub niveau: String,
    pub difficulte: Difficulte,
    /// Nombre d'items souhaité; la génération peut en produire moins
    pub nombre: usize,
    /// Contexte ou consigne libre, prioritaire sur le sujet
    pub contexte: Option<String>,
}

/// Langue de travail d'un item avant traduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Langue {
    Anglais,
    Francais,
}

/// Origine d'un item généré
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Backend qui a produit le texte brut
    pub backend: String,
    /// Langue du texte avant l'étape de traduction
    pub langue: Langue,
}

/// Item QCM généré: une question, quatre options, un index de bonne réponse
///
/// Invariant garanti à la construction: `bonne_reponse` ∈ [1,4] et les quatre
/// options sont non vides. Un item qui ne satisfait pas l'invariant est
/// écarté, jamais stocké.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub texte: String,
    pub reponses: [String; 4],
    /// Index 1-based de la bonne réponse
    pub bonne_reponse: u8,
    pub provenance: Provenance,
    /// Vrai si la lettre de réponse n'a pas été trouvée et que 'A' a été
    /// prise par défaut — l'item mérite une relecture avant publication
    #[serde(default)]
    pub low_confidence: bool,
}

impl GeneratedQuestion {
    /// Construit un item en validant l'invariant; `None` si une option est
    /// vide ou si l'index sort de [1,4]
    pub fn new(
        texte: String,
        reponses: [String; 4],
        bonne_reponse: u8,
        provenance: Provenance,
    ) -> Option<Self> {
        if texte.trim().is_empty() {
            return None;
        }
        if !(1..=4).contains(&bonne_reponse) {
            return None;
        }
        if reponses.iter().any(|r| r.trim().is_empty()) {
            return None;
        }
        Some(Self {
            texte,
            reponses,
            bonne_reponse,
            provenance,
            low_confidence: false,
        })
    }

    /// Marque l'item comme issu du chemin « lettre par défaut »
    pub fn with_low_confidence(mut self) -> Self {
        self.low_confidence = true;
        self
    }

    /// La réponse sélectionnée (1-based) est-elle la bonne ?
    pub fn est_bonne_reponse(&self, selection: u8) -> bool {
        selection == self.bonne_reponse
    }
}

/// Affirmation Vrai/Faux générée depuis un chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VraiFaux {
    pub texte: String,
    pub reponse_correcte: bool,
    pub explication: String,
}

/// Question ouverte générée avec son corrigé type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOuverte {
    pub texte: String,
    pub reponse_attendue: String,
    /// Concepts clés attendus dans la réponse de l'étudiant
    pub mots_cles: Vec<String>,
    pub contexte_source: String,
}

/// Item publié dans la banque d'une évaluation
///
/// Un choix multiple se corrige par comparaison exacte, une question
/// ouverte par similarité sémantique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEvaluation {
    ChoixMultiple(GeneratedQuestion),
    Ouverte(QuestionOuverte),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            backend: "test".to_string(),
            langue: Langue::Anglais,
        }
    }

    #[test]
    fn question_valide() {
        let q = GeneratedQuestion::new(
            "Quelle est la capitale de la France ?".to_string(),
            [
                "Lyon".to_string(),
                "Paris".to_string(),
                "Marseille".to_string(),
                "Bordeaux".to_string(),
            ],
            2,
            provenance(),
        );
        assert!(q.is_some());
        let q = q.unwrap();
        assert!(q.est_bonne_reponse(2));
        assert!(!q.est_bonne_reponse(1));
        assert!(!q.low_confidence);
    }

    #[test]
    fn question_option_vide_rejetee() {
        let q = GeneratedQuestion::new(
            "Question ?".to_string(),
            [
                "a".to_string(),
                "".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            1,
            provenance(),
        );
        assert!(q.is_none());
    }

    #[test]
    fn question_index_hors_bornes_rejetee() {
        let options = [
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ];
        assert!(GeneratedQuestion::new("Q ?".to_string(), options.clone(), 0, provenance()).is_none());
        assert!(GeneratedQuestion::new("Q ?".to_string(), options, 5, provenance()).is_none());
    }

    #[test]
    fn difficulte_find_tolerant() {
        assert_eq!(Difficulte::find("  Moyen "), Some(Difficulte::Moyen));
        assert_eq!(Difficulte::find("FACILE"), Some(Difficulte::Facile));
        assert_eq!(Difficulte::find("hard"), Some(Difficulte::Difficile));
        assert_eq!(Difficulte::find("expert"), None);
    }

    #[test]
    fn descripteurs_de_niveau() {
        assert_eq!(Difficulte::Facile.descripteur(), "beginner-level");
        assert_eq!(Difficulte::Moyen.descripteur(), "intermediate-level");
        assert_eq!(Difficulte::Difficile.descripteur(), "advanced-level");
    }
}
