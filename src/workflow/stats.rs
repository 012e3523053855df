//! Statistiques de classe après correction

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::submission::Resultat;

/// Item souvent raté, avec son nombre d'échecs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRate {
    pub item_id: u64,
    pub echecs: usize,
}

/// Performance d'une classe sur un QCM corrigé
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatistiquesClasse {
    pub effectif: usize,
    pub note_moyenne: f64,
    pub note_mediane: f64,
    pub ecart_type: f64,
    pub note_min: f64,
    pub note_max: f64,
    /// Part des copies à 10/20 ou plus
    pub taux_reussite: f64,
    /// Items les plus ratés, du pire au moins pire
    pub items_les_plus_rates: Vec<ItemRate>,
}

/// Agrège les résultats d'un QCM en statistiques de classe
///
/// Retourne `None` sans résultat à analyser.
pub fn analyser_performance_classe(resultats: &[Resultat]) -> Option<StatistiquesClasse> {
    if resultats.is_empty() {
        return None;
    }

    let mut notes: Vec<f64> = resultats.iter().map(|r| r.note_sur_20).collect();
    notes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let effectif = notes.len();
    let note_moyenne = notes.iter().sum::<f64>() / effectif as f64;
    let note_mediane = if effectif % 2 == 1 {
        notes[effectif / 2]
    } else {
        (notes[effectif / 2 - 1] + notes[effectif / 2]) / 2.0
    };
    let variance = notes
        .iter()
        .map(|n| (n - note_moyenne).powi(2))
        .sum::<f64>()
        / effectif as f64;
    let taux_reussite =
        resultats.iter().filter(|r| r.est_reussi()).count() as f64 / effectif as f64;

    let mut echecs: HashMap<u64, usize> = HashMap::new();
    for resultat in resultats {
        for detail in &resultat.details {
            if !detail.correcte {
                *echecs.entry(detail.item_id).or_insert(0) += 1;
            }
        }
    }
    let mut items_les_plus_rates: Vec<ItemRate> = echecs
        .into_iter()
        .map(|(item_id, echecs)| ItemRate { item_id, echecs })
        .collect();
    items_les_plus_rates.sort_by(|a, b| {
        b.echecs
            .cmp(&a.echecs)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    Some(StatistiquesClasse {
        effectif,
        note_moyenne,
        note_mediane,
        ecart_type: variance.sqrt(),
        note_min: notes[0],
        note_max: notes[effectif - 1],
        taux_reussite,
        items_les_plus_rates,
    })
}
