//! Catalog of technology tags a task can be submitted under.

const TECH_STACKS: &[(&str, &str)] = &[
    ("react", "React"),
    ("angular", "Angular"),
    ("vue", "Vue.js"),
    ("nodejs", "Node.js"),
    ("express", "Express"),
    ("python", "Python"),
    ("django", "Django"),
    ("java", "Java"),
    ("spring", "Spring Boot"),
    ("typescript", "TypeScript"),
    ("sql", "SQL"),
    ("mongodb", "MongoDB"),
    ("docker", "Docker"),
    ("aws", "AWS"),
    ("graphql", "GraphQL"),
    ("nextjs", "Next.js"),
    ("tailwind", "Tailwind CSS"),
    ("csharp", "C#"),
];

pub fn normalize(tech: &str) -> String {
    tech.trim().to_ascii_lowercase()
}

pub fn is_known(tech: &str) -> bool {
    TECH_STACKS.iter().any(|(id, _)| *id == tech)
}

/// Display label, falling back to the raw identifier.
pub fn label(tech: &str) -> &str {
    TECH_STACKS
        .iter()
        .find(|(id, _)| *id == tech)
        .map(|(_, label)| *label)
        .unwrap_or(tech)
}

pub fn all() -> impl Iterator<Item = &'static str> {
    TECH_STACKS.iter().map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fall_back_to_identifier() {
        assert_eq!(label("nodejs"), "Node.js");
        assert_eq!(label("cobol"), "cobol");
    }

    #[test]
    fn normalize_then_lookup() {
        assert!(is_known(&normalize("  React ")));
        assert!(!is_known("cobol"));
        assert_eq!(all().count(), 18);
    }
}
