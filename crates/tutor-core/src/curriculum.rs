//! Declarative topic/sub-skill layout and seeding of a fresh [`SkillMap`].
//!
//! The tracer assumes every sub-skill points at a parent that exists in the
//! same map. Seeding is where that gets checked, so the tracer never has to.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::skill::{SkillMap, SkillNode};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default)]
    pub topics: Vec<TopicDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sub_skills: Vec<SubSkillDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubSkillDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurriculumError {
    EmptyId { topic: Option<String> },
    DuplicateId(String),
    Empty,
}

impl fmt::Display for CurriculumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurriculumError::EmptyId { topic: None } => write!(f, "topic with empty id"),
            CurriculumError::EmptyId { topic: Some(t) } => {
                write!(f, "sub-skill with empty id under topic '{t}'")
            }
            CurriculumError::DuplicateId(id) => {
                write!(f, "id '{id}' appears more than once; ids must be unique across all skills")
            }
            CurriculumError::Empty => write!(f, "curriculum defines no topics"),
        }
    }
}

impl std::error::Error for CurriculumError {}

impl Curriculum {
    /// Build the skill map with every node at `p_init`.
    ///
    /// Ids must be non-empty and unique across topics and sub-skills together.
    /// Names default to the id.
    pub fn seed(&self, p_init: f64) -> Result<SkillMap, CurriculumError> {
        if self.topics.is_empty() {
            return Err(CurriculumError::Empty);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut skills = SkillMap::new();

        for topic in &self.topics {
            let topic_id = topic.id.trim();
            if topic_id.is_empty() {
                return Err(CurriculumError::EmptyId { topic: None });
            }
            if !seen.insert(topic_id) {
                return Err(CurriculumError::DuplicateId(topic_id.to_string()));
            }

            let mut children = Vec::with_capacity(topic.sub_skills.len());
            for sub in &topic.sub_skills {
                let sub_id = sub.id.trim();
                if sub_id.is_empty() {
                    return Err(CurriculumError::EmptyId {
                        topic: Some(topic_id.to_string()),
                    });
                }
                if !seen.insert(sub_id) {
                    return Err(CurriculumError::DuplicateId(sub_id.to_string()));
                }
                skills.insert(
                    sub_id.to_string(),
                    SkillNode::sub_skill(sub_id, display_name(&sub.name, sub_id), topic_id, p_init),
                );
                children.push(sub_id.to_string());
            }

            skills.insert(
                topic_id.to_string(),
                SkillNode::topic(topic_id, display_name(&topic.name, topic_id), children, p_init),
            );
        }

        tracing::debug!(nodes = skills.len(), "skills seeded from curriculum");
        Ok(skills)
    }
}

fn display_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.trim().is_empty() { id } else { name }
}

/// Check the parent invariant on an existing map (e.g. one loaded from
/// storage): every sub-skill names a parent that exists and is a topic.
/// Returns the offending sub-skill ids, sorted.
pub fn orphaned_sub_skills(skills: &SkillMap) -> Vec<String> {
    let mut orphans: Vec<String> = skills
        .values()
        .filter(|n| !n.is_parent)
        .filter(|n| match n.parent_id.as_deref() {
            Some(pid) => !skills.get(pid).is_some_and(|p| p.is_parent),
            None => true,
        })
        .map(|n| n.id.clone())
        .collect();
    orphans.sort();
    orphans
}
