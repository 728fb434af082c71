use log::debug;
use std::fmt;

/// Printed in place of a token that varies between messages of the same template.
pub const WILDCARD: &str = "_";

/// Clustering constants. `Default` gives the values the tool runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Number of tokens taken after the delimiter marker.
    pub window_len: usize,
    /// A template is accepted once its running match count exceeds this.
    pub accept_threshold: usize,
    pub generalize: Generalize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            window_len: 9,
            accept_threshold: 6,
            generalize: Generalize::OnAccept,
        }
    }
}

/// When wildcard conversions made while scanning a template are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generalize {
    /// Only when the scanned template ends up accepted.
    OnAccept,
    /// Even when the scanned template is rejected.
    Always,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Literal(String),
    Wildcard,
}

impl Slot {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Slot::Wildcard)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Literal(token) => f.write_str(token),
            Slot::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// A generalized message: one slot per window position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Template {
    slots: Vec<Slot>,
}

impl Template {
    /// A template with every slot a literal copy of the window.
    pub fn from_window(window: &[String]) -> Self {
        Self {
            slots: window.iter().cloned().map(Slot::Literal).collect(),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn wildcard_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_wildcard()).count()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", slot)?;
        }
        Ok(())
    }
}

/// Index of a template inside its store. Stable, since templates are only ever appended.
pub type TemplateId = usize;

/// Ordered, append-only set of templates for one delimiter.
#[derive(Debug, Default)]
pub struct TemplateStore {
    config: ClusterConfig,
    templates: Vec<Template>,
}

impl TemplateStore {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            templates: Vec::new(),
        }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Find the template this window belongs to, registering the window as a new
    /// template when none is accepted.
    ///
    /// Templates are tried in insertion order and the first one accepted wins.
    /// Positions are compared from the start; while a template is short of the
    /// threshold, each differing literal becomes a wildcard. Once the running
    /// match count exceeds `accept_threshold` the scan returns at once, leaving
    /// later positions untouched.
    pub fn resolve(&mut self, window: &[String]) -> TemplateId {
        debug_assert_eq!(window.len(), self.config.window_len);
        for id in 0..self.templates.len() {
            // Scan a copy so a rejected template can be left alone under `OnAccept`
            let mut candidate = self.templates[id].slots.clone();
            let mut matches = 0;
            let mut accepted = false;
            for (slot, token) in candidate.iter_mut().zip(window) {
                if matches!(slot, Slot::Literal(literal) if literal == token) {
                    matches += 1;
                    if matches > self.config.accept_threshold {
                        accepted = true;
                        break;
                    }
                } else {
                    *slot = Slot::Wildcard;
                }
            }
            if accepted || self.config.generalize == Generalize::Always {
                self.templates[id].slots = candidate;
            }
            if accepted {
                return id;
            }
        }
        let template = Template::from_window(window);
        debug!("new template #{}: {}", self.templates.len(), template);
        self.templates.push(template);
        self.templates.len() - 1
    }

    pub fn get(&self, id: TemplateId) -> &Template {
        &self.templates[id]
    }

    /// The current form of a previously returned template label: the first stored
    /// template that reaches the threshold against `label` under the same
    /// early-exit rule, with wildcards equal to wildcards. Nothing is mutated.
    pub fn relabel<'a>(&'a self, label: &'a Template) -> &'a Template {
        self.templates
            .iter()
            .find(|template| {
                let mut matches = 0;
                template.slots.iter().zip(&label.slots).any(|(a, b)| {
                    if a == b {
                        matches += 1;
                    }
                    matches > self.config.accept_threshold
                })
            })
            .unwrap_or(label)
    }
}
