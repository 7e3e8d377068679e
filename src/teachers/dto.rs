use serde::Deserialize;

use crate::people::NewPerson;

#[derive(Debug, Deserialize)]
pub struct CreateTeacherRequest {
    #[serde(flatten)]
    pub person: NewPerson,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeacherRequest {
    pub name: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
}

/// Drops blanks and duplicates from a free-text tag list.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        let t = t.trim().to_string();
        if !t.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(&t)) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tags_trims_and_dedupes() {
        let tags = vec![" Math ".into(), "math".into(), "".into(), "Physics".into()];
        assert_eq!(clean_tags(tags), vec!["Math", "Physics"]);
    }
}
