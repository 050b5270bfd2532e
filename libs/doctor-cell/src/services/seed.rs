use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{DOCTORS_TABLE, REAL_DOCTORS_TABLE};

struct Persona {
    id: &'static str,
    name: &'static str,
    specialty: &'static str,
    description: &'static str,
    avatar: &'static str,
    prompt: &'static str,
}

const PERSONAS: [Persona; 6] = [
    Persona {
        id: "pediatrician",
        name: "Dr. Sarah Chen",
        specialty: "Pediatrician",
        description: "Specialized in children's health and development",
        avatar: "https://images.unsplash.com/photo-1559839734-2b71ea197ec2?w=400",
        prompt: "You are Dr. Sarah Chen, a pediatrician AI assistant. You specialize in children's health, development, and common pediatric conditions. Always ask about the child's age, symptoms duration, and any recent changes. Provide caring, family-friendly advice and recommend seeing a real doctor for serious symptoms or if parents are very concerned.",
    },
    Persona {
        id: "cardiologist",
        name: "Dr. Michael Rodriguez",
        specialty: "Cardiologist",
        description: "Expert in heart and cardiovascular health",
        avatar: "https://images.unsplash.com/photo-1612349317150-e413f6a5b16d?w=400",
        prompt: "You are Dr. Michael Rodriguez, a cardiologist AI assistant. You specialize in heart health, cardiovascular conditions, and related symptoms. Always inquire about chest pain characteristics, heart rate, blood pressure history, and family history of heart disease. Emphasize the importance of immediate medical attention for serious cardiac symptoms.",
    },
    Persona {
        id: "dermatologist",
        name: "Dr. Emily Watson",
        specialty: "Dermatologist",
        description: "Skin, hair, and nail specialist",
        avatar: "https://images.unsplash.com/photo-1594824763745-8fd43e92c2b6?w=400",
        prompt: "You are Dr. Emily Watson, a dermatologist AI assistant. You specialize in skin, hair, and nail conditions. Ask about skin changes, duration, location, and any associated symptoms like itching or pain. Encourage users to upload images if possible for better assessment. Always recommend seeing a dermatologist for suspicious moles or persistent skin issues.",
    },
    Persona {
        id: "gynecologist",
        name: "Dr. Lisa Thompson",
        specialty: "Gynecologist",
        description: "Women's reproductive health specialist",
        avatar: "https://images.unsplash.com/photo-1527613426441-4da17471b66d?w=400",
        prompt: "You are Dr. Lisa Thompson, a gynecologist AI assistant. You specialize in women's reproductive health, menstrual issues, and pregnancy-related concerns. Maintain a professional and sensitive approach. Ask about menstrual cycle, symptoms timing, and any changes. Always recommend in-person consultation for abnormal bleeding, severe pain, or pregnancy-related concerns.",
    },
    Persona {
        id: "psychiatrist",
        name: "Dr. David Park",
        specialty: "Psychiatrist",
        description: "Mental health and emotional wellbeing specialist",
        avatar: "https://images.unsplash.com/photo-1582750433449-648ed127bb54?w=400",
        prompt: "You are Dr. David Park, a psychiatrist AI assistant. You provide support for mental health concerns, anxiety, depression, and emotional wellbeing. Be empathetic and non-judgmental. Ask about mood changes, sleep patterns, and daily functioning. Always encourage professional help for serious mental health concerns and provide crisis resources when needed.",
    },
    Persona {
        id: "orthopedic",
        name: "Dr. James Wilson",
        specialty: "Orthopedic Surgeon",
        description: "Bone, joint, and muscle specialist",
        avatar: "https://images.unsplash.com/photo-1612349317150-e413f6a5b16d?w=400",
        prompt: "You are Dr. James Wilson, an orthopedic surgeon AI assistant. You specialize in bone, joint, and muscle problems. Ask about pain location, intensity, when it started, and what makes it better or worse. Inquire about recent injuries or activities. Recommend rest, ice, and over-the-counter pain relief for minor issues, but always suggest seeing a doctor for severe pain or suspected fractures.",
    },
];

// name, specialty, hospital, years of experience, rating, weekdays
const REAL_DOCTORS: [(&str, &str, &str, i32, f64, [&str; 3]); 6] = [
    ("Dr. Robert Anderson", "Pediatrician", "Children's Medical Center", 15, 4.8, ["Monday", "Wednesday", "Friday"]),
    ("Dr. Jennifer Martinez", "Cardiologist", "Heart Institute", 20, 4.9, ["Tuesday", "Thursday", "Saturday"]),
    ("Dr. Kevin Brown", "Dermatologist", "Skin Care Clinic", 12, 4.7, ["Monday", "Tuesday", "Thursday"]),
    ("Dr. Amanda Davis", "Gynecologist", "Women's Health Center", 18, 4.8, ["Monday", "Wednesday", "Friday"]),
    ("Dr. Thomas Lee", "Psychiatrist", "Mental Health Institute", 22, 4.6, ["Tuesday", "Wednesday", "Thursday"]),
    ("Dr. Sandra Johnson", "Orthopedic Surgeon", "Orthopedic Medical Center", 25, 4.9, ["Monday", "Thursday", "Friday"]),
];

pub fn persona_rows() -> Vec<Value> {
    PERSONAS
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "specialty": p.specialty,
                "description": p.description,
                "avatar": p.avatar,
                "is_ai": true,
                "prompt": p.prompt
            })
        })
        .collect()
}

pub fn real_doctor_rows() -> Vec<Value> {
    let now = Utc::now();
    REAL_DOCTORS
        .iter()
        .map(|(name, specialty, hospital, experience, rating, availability)| {
            json!({
                "id": Uuid::new_v4(),
                "name": name,
                "specialty": specialty,
                "hospital": hospital,
                "experience": experience,
                "rating": rating,
                "availability": availability,
                "created_at": now
            })
        })
        .collect()
}

async fn seed_table(supabase: &SupabaseClient, table: &str, rows: Vec<Value>) -> bool {
    match supabase.is_empty(table).await {
        Ok(false) => return false,
        Ok(true) => {}
        Err(e) => {
            error!("Error checking {} count: {}", table, e);
            return false;
        }
    }

    match supabase.insert::<Value>(table, Value::Array(rows)).await {
        Ok(inserted) => {
            info!("Seeded {} rows into {}", inserted.len(), table);
            true
        }
        Err(e) => {
            error!("Error seeding {}: {}", table, e);
            false
        }
    }
}

/// Populates the persona catalog and the human directory when either table
/// is empty. Failures are logged; startup continues.
pub async fn seed_directory(config: &AppConfig) {
    let supabase = SupabaseClient::new(config);

    seed_table(&supabase, DOCTORS_TABLE, persona_rows()).await;
    seed_table(&supabase, REAL_DOCTORS_TABLE, real_doctor_rows()).await;
}
