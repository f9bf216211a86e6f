/// Maximum characters of user text placed in a prompt.
pub const MAX_SUBJECT_CHARS: usize = 2000;

/// Clean user text before it is embedded in a prompt.
///
/// Strips control characters (newlines and tabs become spaces), collapses
/// runs of whitespace, and caps the length at `MAX_SUBJECT_CHARS`.
pub fn sanitize_subject(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

/// Prompt asking for a ranked list of plausible conditions.
pub fn build_symptom_prompt(symptoms: &str) -> String {
    let symptoms = sanitize_subject(symptoms);
    format!(
        r#"Act as a medical AI assistant. A user describes the following symptoms: "{symptoms}".
Suggest the 3 most plausible conditions, most likely first. This is for informational purposes only.
Return a JSON object with a single key "predictions" which is an array of objects. Each object must have:
- "disease": string (condition name),
- "confidence": number from 0 to 100,
- "description": string (a short plain-language explanation),
- "recovery": array of strings (self-care or recovery steps),
- "matchedSymptoms": array of strings (which of the user's symptoms this condition explains),
- "severity": integer 1 (mild), 2 (moderate) or 3 (severe),
- "specialist": string (type of professional to consult).
Only return valid JSON."#
    )
}

/// Prompt asking for a drug-drug interaction review of `medications_text`.
pub fn build_interaction_prompt(medications_text: &str) -> String {
    let medications_text = sanitize_subject(medications_text);
    format!(
        "You are a clinical decision support assistant. Given the following list of medications: {medications_text}. \
Analyze potential drug-drug interactions and combined side effects. Return a JSON object with keys: \n\
- \"safe\": boolean (true if no clinically significant interactions),\n\
- \"interactions\": array of objects with {{\"medications\": [\"A\",\"B\"], \"interaction\": \"short description\", \"severity\": \"low|moderate|high\"}},\n\
- \"recommendations\": string (what to change or monitoring suggestions).\n\
Only return valid JSON."
    )
}

/// Prompt asking for a sample starting medication plan for `disease`.
pub fn build_plan_prompt(disease: &str) -> String {
    let disease = sanitize_subject(disease);
    format!(
        "Act as a medical AI. For a patient with a potential diagnosis of \"{disease}\", suggest a typical, sample medication plan. \
Include 1-2 common medications, their usual dosage, and a standard time of day to take them. \
This is for informational purposes only. Return the response as a JSON object with a single key \"medications\" \
which is an array of objects. Each object should have \"name\", \"dosage\", and \"time\"."
    )
}
