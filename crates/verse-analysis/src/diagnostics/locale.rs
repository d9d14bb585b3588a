//! Message tables for rendering explanations.

use rustc_hash::FxHashMap;

/// Messages of one language, keyed by `Kind.part`.
#[derive(Debug, Clone, Default)]
pub struct Locale {
    pub language: String,
    messages: FxHashMap<String, String>,
}

impl Locale {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            messages: FxHashMap::default(),
        }
    }

    pub fn with(mut self, key: &str, template: &str) -> Self {
        self.messages.insert(key.to_string(), template.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn english() -> Self {
        Locale::new("en")
            .with("UnknownName.primary", "I don't know what $1 refers to.")
            .with("UnknownProperty.primary", "There is no $1 on $2.")
            .with("UnknownColumn.primary", "$1 is not a column of $2.")
            .with("UnknownTypeName.primary", "There is no type named $1.")
            .with(
                "UnexpectedTypeVariable.primary",
                "$1 is a type variable and can't be used as a value.",
            )
            .with("CircularReference.primary", "$1 refers to the value it defines.")
            .with("CircularReference.secondary", "$1 is defined in terms of itself.")
            .with("NotAFunction.primary", "$1 is $2, not a function.")
            .with("IncompatibleInput.primary", "Expected $1, received $2.")
            .with("MissingInput.primary", "$1 is required, but wasn't given.")
            .with("MissingInput.secondary", "$1 needs another input.")
            .with("UnexpectedInput.primary", "$1 isn't an input of this function.")
            .with("UnexpectedInput.secondary", "$1 takes fewer inputs.")
            .with("UnknownOperator.primary", "There is no $1 on $2.")
            .with("ExpectedBooleanCondition.primary", "Expected a ? condition, received $1.")
            .with("ExpectedStream.primary", "$1 is not a stream.")
            .with("NotATable.primary", "Expected a table, received $1.")
            .with("ExpectedSelectName.primary", "$1 should name a column.")
            .with("NonBooleanQuery.primary", "Expected a ? query, received $1.")
            .with("Placeholder.primary", "This still needs to be written.")
            .with("CaseCollision.primary", "$1 looks a lot like $2.")
            .with("CaseCollision.secondary", "$1 differs only by case.")
    }
}

/// Locales in order of preference.
#[derive(Debug, Clone)]
pub struct Locales {
    locales: Vec<Locale>,
}

impl Locales {
    pub fn new(locales: Vec<Locale>) -> Self {
        Self { locales }
    }

    /// The template of `key` in the most preferred locale that has it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.locales.iter().find_map(|l| l.get(key))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(|l| l.language.as_str())
    }
}

impl Default for Locales {
    fn default() -> Self {
        Self::new(vec![Locale::english()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_through_preferences() {
        let locales = Locales::new(vec![
            Locale::new("fr").with("UnknownName.primary", "Je ne sais pas ce que $1 désigne."),
            Locale::english(),
        ]);
        assert_eq!(
            locales.get("UnknownName.primary"),
            Some("Je ne sais pas ce que $1 désigne.")
        );
        assert_eq!(
            locales.get("MissingInput.secondary"),
            Some("$1 needs another input.")
        );
        assert_eq!(locales.get("Nothing.primary"), None);
        assert_eq!(locales.languages().collect::<Vec<_>>(), ["fr", "en"]);
    }
}
