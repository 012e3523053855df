use crate::models::question::SourceChunk;

/// Découpe un texte source en chunks ordonnés d'au plus `max_len` caractères
///
/// Stratégie en trois niveaux: les paragraphes sont regroupés tant qu'ils
/// tiennent; un paragraphe trop long est redécoupé en phrases; une phrase
/// plus longue que `max_len` est tronquée en tranches dures. La concaténation
/// des chunks restitue le texte à l'espacement près, et l'ordre suit le
/// document. La sortie n'est jamais vide: un texte vide donne un chunk
/// dégénéré unique.
pub fn decouper_texte(texte: &str, max_len: usize) -> Vec<SourceChunk> {
    let max_len = max_len.max(1);
    let mut morceaux: Vec<String> = Vec::new();
    let mut courant = String::new();

    for paragraphe in texte.split("\n\n") {
        let paragraphe = paragraphe.trim();
        if paragraphe.is_empty() {
            continue;
        }

        if paragraphe.chars().count() > max_len {
            // Le paragraphe ne tiendra jamais, on vide l'accumulateur puis
            // on le redécoupe en phrases
            if !courant.is_empty() {
                morceaux.push(std::mem::take(&mut courant));
            }
            decouper_paragraphe(paragraphe, max_len, &mut morceaux);
            continue;
        }

        if courant.is_empty() {
            courant = paragraphe.to_string();
        } else if courant.chars().count() + 1 + paragraphe.chars().count() <= max_len {
            courant.push(' ');
            courant.push_str(paragraphe);
        } else {
            morceaux.push(std::mem::take(&mut courant));
            courant = paragraphe.to_string();
        }
    }

    if !courant.is_empty() {
        morceaux.push(courant);
    }
    if morceaux.is_empty() {
        morceaux.push(texte.trim().to_string());
    }

    morceaux
        .into_iter()
        .enumerate()
        .map(|(index, texte)| SourceChunk { index, texte })
        .collect()
}

/// Redécoupe un paragraphe trop long en phrases, puis en tranches dures
fn decouper_paragraphe(paragraphe: &str, max_len: usize, morceaux: &mut Vec<String>) {
    let mut courant = String::new();

    for phrase in decouper_phrases(paragraphe) {
        if phrase.chars().count() > max_len {
            if !courant.is_empty() {
                morceaux.push(std::mem::take(&mut courant));
            }
            tronquer_dur(&phrase, max_len, morceaux);
            continue;
        }

        if courant.is_empty() {
            courant = phrase;
        } else if courant.chars().count() + 1 + phrase.chars().count() <= max_len {
            courant.push(' ');
            courant.push_str(&phrase);
        } else {
            morceaux.push(std::mem::take(&mut courant));
            courant = phrase;
        }
    }

    if !courant.is_empty() {
        morceaux.push(courant);
    }
}

/// Découpe naïve en phrases sur `.`, `!` et `?`, ponctuation conservée
fn decouper_phrases(texte: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    let mut courante = String::new();

    for c in texte.chars() {
        courante.push(c);
        if matches!(c, '.' | '!' | '?') {
            let phrase = courante.trim().to_string();
            if !phrase.is_empty() {
                phrases.push(phrase);
            }
            courante.clear();
        }
    }

    let reste = courante.trim();
    if !reste.is_empty() {
        phrases.push(reste.to_string());
    }

    phrases
}

/// Tranches dures de `max_len` caractères, sans garantie de coupure propre
fn tronquer_dur(phrase: &str, max_len: usize, morceaux: &mut Vec<String>) {
    let chars: Vec<char> = phrase.chars().collect();
    for tranche in chars.chunks(max_len) {
        let t: String = tranche.iter().collect();
        let t = t.trim().to_string();
        if !t.is_empty() {
            morceaux.push(t);
        }
    }
}
