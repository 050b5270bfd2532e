/// Phrases in the patient's message that warrant an in-person visit.
pub const URGENT_SYMPTOMS: [&str; 15] = [
    "severe",
    "emergency",
    "urgent",
    "chest pain",
    "difficulty breathing",
    "blood",
    "seizure",
    "unconscious",
    "broken bone",
    "fracture",
    "suicidal",
    "heart attack",
    "stroke",
    "high fever",
    "persistent pain",
];

/// Phrases in the AI reply that already amount to a referral.
pub const REFERRAL_PHRASES: [&str; 6] = [
    "recommend seeing",
    "consult a doctor",
    "medical attention",
    "see a specialist",
    "hospital",
    "emergency room",
];

pub const ESCALATION_NOTICE: &str = "\n\n🏥 Based on your symptoms, I recommend scheduling an appointment with a real doctor for proper examination and treatment. Would you like me to help you find available doctors in my specialty?";

pub fn should_recommend_real_doctor(ai_response: &str, user_message: &str) -> bool {
    let user_lower = user_message.to_lowercase();
    let response_lower = ai_response.to_lowercase();

    URGENT_SYMPTOMS.iter().any(|term| user_lower.contains(term))
        || REFERRAL_PHRASES.iter().any(|phrase| response_lower.contains(phrase))
}
