use std::collections::HashMap;

use heck::ToSnakeCase;

use crate::error::{CatalogError, Result};

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "headquarters",
    "information",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("analysis", "analyses"),
    ("child", "children"),
    ("criterion", "criteria"),
    ("foot", "feet"),
    ("index", "indices"),
    ("man", "men"),
    ("matrix", "matrices"),
    ("mouse", "mice"),
    ("person", "people"),
    ("woman", "women"),
];

pub fn to_storage_name(identifier: &str) -> String {
    identifier.to_snake_case()
}

pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };
    if last.is_empty() {
        return word.to_string();
    }
    format!("{}{}", head, pluralize_word(last))
}

fn pluralize_word(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return (*plural).to_string();
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before_y = stem.chars().last();
        if matches!(before_y, Some(c) if !"aeiou".contains(c)) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

pub fn table_name_for(type_name: &str) -> String {
    pluralize(&to_storage_name(type_name))
}

#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<String, &'static str>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: &'static str, table: &str) -> Result<()> {
        match self.tables.get(table) {
            Some(owner) if *owner != entity => Err(CatalogError::Configuration(format!(
                "table {} is claimed by both {} and {}",
                table, owner, entity
            ))),
            Some(_) => Ok(()),
            None => {
                self.tables.insert(table.to_string(), entity);
                Ok(())
            }
        }
    }

    pub fn owner_of(&self, table: &str) -> Option<&'static str> {
        self.tables.get(table).copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
