use crate::detection::domain::Policy;
use crate::shared::security::read_input_file;
use crate::shared::Result;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolicyDocument {
    List(Vec<Policy>),
    Wrapped { policies: Vec<Policy> },
}

/// Loads an initial policy set from a YAML or JSON file.
///
/// The file holds either a list of policies or an object with a `policies`
/// list.
pub fn load_policies(path: &Path) -> Result<Vec<Policy>> {
    let content = read_input_file(path, "policy file")?;
    let document: PolicyDocument = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse policy file: {}\n\n💡 Hint: Expected a list of policies or a 'policies:' key.",
            path.display()
        )
    })?;
    Ok(match document {
        PolicyDocument::List(policies) | PolicyDocument::Wrapped { policies } => policies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::EnforcementAction;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policies.yml");
        fs::write(
            &path,
            r#"
- id: no-latest
  name: No latest tag
  lifecycle_stages: [DEPLOY]
  enforcement_action: SCALE_TO_ZERO
  criteria:
    image_name_patterns: ["*:latest"]
"#,
        )
        .unwrap();

        let policies = load_policies(&path).unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].enforcement_action, EnforcementAction::ScaleToZero);
        assert_eq!(policies[0].criteria.image_name_patterns, vec!["*:latest"]);
    }

    #[test]
    fn test_load_wrapped_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policies.json");
        fs::write(
            &path,
            r#"{"policies": [{"id": "p1", "name": "one", "lifecycle_stages": ["RUNTIME"]}]}"#,
        )
        .unwrap();

        let policies = load_policies(&path).unwrap();
        assert_eq!(policies[0].id, "p1");
    }

    #[test]
    fn test_load_invalid_policy_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policies.yml");
        fs::write(&path, "policies: 42\n").unwrap();

        let err = load_policies(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse policy file"));
    }
}
