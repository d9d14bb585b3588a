//! Compilation unit API.
//!
//! A [`Unit`] pairs a frozen [`Project`] with the name of the source to
//! work on, and runs the pipeline over it: analysis, compilation and
//! evaluation.
//!
//! # Example
//!
//! ```
//! use verse::Unit;
//! use verse_analysis::ProjectBuilder;
//! use verse_core::Value;
//!
//! let mut project = ProjectBuilder::new();
//! project.install(verse_modules::install).unwrap();
//! let b = project.builder();
//! let one = b.number(1.0);
//! let two = b.number(2.0);
//! let sum = b.binary("+", one, two);
//! let root = b.block(vec![sum]);
//! project.add_source("main", root).unwrap();
//!
//! let unit = Unit::new(project.finish().unwrap(), "main").unwrap();
//! assert!(unit.analyze().unwrap().is_empty());
//! assert_eq!(unit.evaluate().unwrap(), Some(Value::number(3.0)));
//! ```

use tracing::debug;

use verse_analysis::{Context, Diagnostics, Locales, Program, Project, analyze, compile};
use verse_core::Value;

use crate::config::EvaluatorConfig;
use crate::error::UnitError;
use crate::evaluator::Evaluator;
use crate::interpreter::Interpreter;

pub struct Unit {
    project: Project,
    source: String,
    config: EvaluatorConfig,
    locales: Locales,
}

impl Unit {
    /// A unit over the source `source` of `project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the project has no such source.
    pub fn new(project: Project, source: &str) -> Result<Self, UnitError> {
        project.source(source)?;
        Ok(Self {
            project,
            source: source.to_string(),
            config: EvaluatorConfig::default(),
            locales: Locales::default(),
        })
    }

    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_locales(mut self, locales: Locales) -> Self {
        self.locales = locales;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> EvaluatorConfig {
        self.config
    }

    /// A fresh analysis pass over the unit's source.
    pub fn context(&self) -> Result<Context<'_>, UnitError> {
        Ok(self.project.context(&self.source)?)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn analyze(&self) -> Result<Diagnostics, UnitError> {
        let mut ctx = self.context()?;
        Ok(analyze(&mut ctx))
    }

    /// Every diagnostic's primary explanation, rendered in the unit's
    /// locales.
    pub fn explain(&self) -> Result<Vec<String>, UnitError> {
        let mut ctx = self.context()?;
        let diagnostics = analyze(&mut ctx);
        Ok(diagnostics
            .iter()
            .map(|d| d.primary(&ctx).explanation.render(&self.locales, &ctx))
            .collect())
    }

    pub fn compile(&self) -> Result<Program, UnitError> {
        let mut ctx = self.context()?;
        Ok(compile(&mut ctx))
    }

    /// An evaluator over a program compiled from this unit.
    pub fn evaluator<'p>(&'p self, program: &'p Program) -> Evaluator<'p> {
        Evaluator::new(&self.project, program, self.config)
    }

    /// Compile and evaluate the source. Returns `None` when it waits for a
    /// stream that has not emitted.
    pub fn evaluate(&self) -> Result<Option<Value>, UnitError> {
        let program = self.compile()?;
        let value = self.evaluator(&program).start()?;
        debug!(source = %self.source, ?value, "evaluated unit");
        Ok(value)
    }

    /// Evaluate the source directly, without stepping.
    pub fn interpret(&self) -> Result<Value, UnitError> {
        let program = self.compile()?;
        Ok(Interpreter::new(&self.project, &program, self.config).evaluate()?)
    }
}
