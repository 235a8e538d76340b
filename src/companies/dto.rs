use serde::Deserialize;

/// Width of the `companies.name` and `companies.website` columns.
pub const MAX_FIELD_LENGTH: usize = 255;

#[derive(Debug, Deserialize)]
pub struct CompanySearch {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl CreateCompanyRequest {
    /// Name is required; blank optional fields are stored as NULL.
    pub fn normalized(self) -> Result<Self, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("name must not be empty".into());
        }
        let website = non_blank(self.website);
        fits("name", Some(&name))?;
        fits("website", website.as_deref())?;
        Ok(Self {
            name,
            description: non_blank(self.description),
            website,
        })
    }
}

impl UpdateCompanyRequest {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err("name must not be empty".into());
        }
        fits("name", self.name.as_deref().map(str::trim))?;
        fits("website", self.website.as_deref())
    }
}

fn fits(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > MAX_FIELD_LENGTH => {
            Err(format!("{field} must be at most {MAX_FIELD_LENGTH} characters"))
        }
        _ => Ok(()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_trims_and_requires_name() {
        let req = CreateCompanyRequest {
            name: "  Acme ".into(),
            description: Some("   ".into()),
            website: Some(" https://acme.test ".into()),
        }
        .normalized()
        .expect("valid");
        assert_eq!(req.name, "Acme");
        assert_eq!(req.description, None);
        assert_eq!(req.website.as_deref(), Some("https://acme.test"));

        let err = CreateCompanyRequest {
            name: " ".into(),
            description: None,
            website: None,
        }
        .normalized();
        assert!(err.is_err());
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let long = "x".repeat(MAX_FIELD_LENGTH + 1);
        let err = CreateCompanyRequest {
            name: long.clone(),
            description: Some(long.clone()),
            website: None,
        }
        .normalized()
        .unwrap_err();
        assert_eq!(err, "name must be at most 255 characters");

        let err = CreateCompanyRequest {
            name: "Acme".into(),
            description: None,
            website: Some(long.clone()),
        }
        .normalized()
        .unwrap_err();
        assert!(err.starts_with("website"));

        // descriptions are unbounded text
        let ok = CreateCompanyRequest {
            name: "x".repeat(MAX_FIELD_LENGTH),
            description: Some(long.clone()),
            website: None,
        }
        .normalized();
        assert!(ok.is_ok());

        let update = UpdateCompanyRequest {
            name: Some(long),
            description: None,
            website: None,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_rejects_blank_name() {
        let req: UpdateCompanyRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(req.validate().is_err());
        let req: UpdateCompanyRequest = serde_json::from_str(r#"{"website": "x"}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
