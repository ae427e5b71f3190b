//! Persona definitions
//!
//! The built-in trio reproduces the analyst/engineer/owner workflow. A JSON
//! file with the same shape can replace it at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUSINESS_ANALYST: &str = "You are a Business Analyst which will take the requirements from the user (also known as a 'customer') and create a project plan for creating the requested app. The Business Analyst understands the user requirements and creates detailed documents with requirements and costing. The documents should be usable by the SoftwareEngineer as a reference for implementing the required features, and by the Product Owner for reference to determine if the application delivered by the Software Engineer meets all of the user's requirements.";

const SOFTWARE_ENGINEER: &str = "You are a Software Engineer, and your goal is create a web app using HTML and JavaScript by taking into consideration all the requirements given by the Business Analyst. The application should implement all the requested features. Deliver the code to the Product Owner for review when completed. You can also ask questions of the BusinessAnalyst to clarify any requirements that are unclear.";

const PRODUCT_OWNER: &str = "You are the Product Owner which will review the software engineer's code to ensure all user requirements are completed. You are the guardian of quality, ensuring the final product meets all specifications. IMPORTANT: Verify that the Software Engineer has shared the HTML code using the format ```html [code] ```. This format is required for the code to be saved and pushed to GitHub. Once all client requirements are completed and the code is properly formatted, reply with 'READY FOR USER APPROVAL'. If there are missing features or formatting issues, you will need to send a request back to the SoftwareEngineer or BusinessAnalyst with details of the defect.";

/// A named role and the instructions that drive it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub instructions: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }
}

/// Business Analyst, Software Engineer, Product Owner, in turn order
pub fn default_personas() -> Vec<Persona> {
    vec![
        Persona::new("BusinessAnalyst", BUSINESS_ANALYST),
        Persona::new("SoftwareEngineer", SOFTWARE_ENGINEER),
        Persona::new("ProductOwner", PRODUCT_OWNER),
    ]
}

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("failed to read personas from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse personas in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("persona file {} defines no personas", .0.display())]
    Empty(PathBuf),

    #[error("invalid persona name {0:?}: use 1 to 64 letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("duplicate persona name {0:?}")]
    Duplicate(String),
}

/// Load personas from a JSON array of `{ "name", "instructions" }` objects
pub fn load_personas(path: &Path) -> Result<Vec<Persona>, PersonaError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PersonaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let personas: Vec<Persona> =
        serde_json::from_str(&raw).map_err(|source| PersonaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if personas.is_empty() {
        return Err(PersonaError::Empty(path.to_path_buf()));
    }
    validate(&personas)?;

    tracing::info!(
        path = %path.display(),
        personas = ?personas.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "Loaded personas"
    );
    Ok(personas)
}

/// Longest name the chat API's `name` field accepts
const MAX_NAME_LEN: usize = 64;

// Names travel as the chat API's `name` field, which only accepts this alphabet.
fn validate(personas: &[Persona]) -> Result<(), PersonaError> {
    let mut seen = HashSet::new();
    for persona in personas {
        let valid = !persona.name.is_empty()
            && persona.name.len() <= MAX_NAME_LEN
            && persona
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersonaError::InvalidName(persona.name.clone()));
        }
        if !seen.insert(persona.name.as_str()) {
            return Err(PersonaError::Duplicate(persona.name.clone()));
        }
    }
    Ok(())
}
