//! Skill catalog offered by the submission form.
//!
//! Each selected skill fills one `{{ skillN }}` slot with its description line.

use serde::Serialize;

pub const MAX_SELECTED_SKILLS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: &'static str,
    pub description: &'static str,
}

/// Display order is the order of this table.
pub const SKILLS: &[Skill] = &[
    Skill {
        name: "Deep Learning",
        description: "Deep Learning : PyTorch, TensorFlow : modélisation, entraînement, optimisation.",
    },
    Skill {
        name: "Machine Learning",
        description: "Machine Learning : Scikit-learn, XGBoost, LightGBM, régression, SVM, forêts aléatoires.",
    },
    Skill {
        name: "NLP & CV",
        description: "NLP & Computer Vision : LLM (HuggingFace), YOLOvX, OpenCV, traitement texte et image.",
    },
    Skill {
        name: "Dév & Intégration",
        description: "Dév & Intégration : Python, scripts ML, FastAPI, Flask, intégration modèles et APIs.",
    },
    Skill {
        name: "Orchestration",
        description: "Orchestration : Airflow, Kubernetes : pipelines ML, workflows distribués.",
    },
    Skill {
        name: "DevOps",
        description: "DevOps CI/CD: GitHub, Actions, Jenkins, ArgoCD, Prometheus, Grafana, Loki.",
    },
    Skill {
        name: "Bases de données",
        description: "Bases de données : MongoDB, PostgreSQL, MariaDB, MySQL, Neo4j (Cypher).",
    },
    Skill {
        name: "Cloud",
        description: "Cloud : GCP, AWS, Azure, Kubernetes, Docker",
    },
    Skill {
        name: "Sécurité & Auth",
        description: "Securité : OAuth2, OpenID, Keycloak, Vault, secrets management.",
    },
    Skill {
        name: "MLOPS",
        description: "MLOPS : MLflow, DVC, versioning, monitoring, CI/CD ML.",
    },
];

pub fn find_skill(name: &str) -> Option<&'static Skill> {
    SKILLS.iter().find(|s| s.name == name)
}
