use crate::generation::concepts::TypeContenu;
use crate::models::question::Difficulte;

/// Construit le prompt QCM pour un chunk de texte source
///
/// Le prompt embarque un exemple complet du format attendu, ce qui stabilise
/// nettement la sortie des modèles seq2seq. Le texte est généré en anglais
/// puis traduit en aval.
pub fn construire_prompt_qcm(
    chunk: &str,
    matiere: &str,
    difficulte: Difficulte,
    type_contenu: TypeContenu,
    concepts: &[String],
) -> String {
    // Un chunk sans concept extractible garde un focus de substitution
    let focus = if concepts.is_empty() {
        "Focus on the main idea of the text.\n".to_string()
    } else {
        format!("Focus on these key concepts: {}.\n", concepts.join(", "))
    };

    format!(
        r#"Generate a {niveau} multiple-choice question for a {matiere} assessment, based on this {domaine} text.

Text: {chunk}

{focus}Use exactly this format:
Q: What is the capital of France?
A) London
B) Paris
C) Berlin
D) Madrid
Answer: B

Write one question with four plausible options and exactly one correct answer."#,
        niveau = difficulte.descripteur(),
        matiere = matiere,
        domaine = type_contenu.descripteur(),
        chunk = chunk,
        focus = focus,
    )
}

/// Construit le prompt Vrai/Faux pour un chunk
pub fn construire_prompt_vrai_faux(chunk: &str, difficulte: Difficulte) -> String {
    format!(
        r#"Generate a {niveau} true/false statement about this text.

Text: {chunk}

Use exactly this format:
Statement: The Earth revolves around the Sun.
Answer: True
Explanation: The Earth completes one orbit around the Sun every year.

Write one statement, its answer (True or False) and a short explanation."#,
        niveau = difficulte.descripteur(),
        chunk = chunk,
    )
}

/// Construit le prompt de question ouverte pour un chunk
pub fn construire_prompt_question_ouverte(chunk: &str, difficulte: Difficulte) -> String {
    format!(
        r#"Generate a {niveau} open-ended question about this text, with a model answer.

Text: {chunk}

Use exactly this format:
Question: Explain why plants need sunlight.
Expected answer: Plants use sunlight to drive photosynthesis, which produces the glucose they need to grow.
Keywords: photosynthesis, sunlight, glucose

Write one question, a model answer of two or three sentences, and three to five keywords."#,
        niveau = difficulte.descripteur(),
        chunk = chunk,
    )
}
