//! Inlines named imports from a constants module as string literals.
//!
//! Redux action types live in a module of named constants
//! (`export const INCREMENT = 'INCREMENT'`). Importing the constants catches
//! typos at build time, but shipping the dictionary adds nothing at runtime.
//! This plugin replaces every reference to such an import with a string
//! literal holding the *exported* name:
//!
//! ```js
//! import { INCREMENT as INC, RESET } from 'state/action-types';
//! if (INC === type) { return state + 1 }
//! if (RESET === type) { return 0 }
//! ```
//!
//! becomes
//!
//! ```js
//! import { INCREMENT as INC, RESET } from 'state/action-types';
//! if ("INCREMENT" === type) { return state + 1 }
//! if ("RESET" === type) { return 0 }
//! ```
//!
//! The now dead import is left to the host's dead-import elimination unless
//! `prune_imports` is set.

use std::collections::{HashMap, HashSet};
use swc_core::{
    common::Span,
    ecma::{
        ast::{Id, *},
        visit::{Visit, VisitMut, VisitMutWith, VisitWith},
    },
    plugin::{plugin_transform, proxies::TransformPluginProgramMetadata},
};


// -----------------------------------------------------------------------------
// Config
// -----------------------------------------------------------------------------

pub const DEFAULT_MODULE: &str = "state/action-types";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import source whose named bindings get inlined. Compared verbatim.
    pub module: String,
    /// Drop target specifiers (and emptied import declarations) once they have
    /// no remaining uses.
    pub prune_imports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module: DEFAULT_MODULE.to_string(),
            prune_imports: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid plugin config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plugin config `module` must not be empty")]
    EmptyModule,
}

impl Config {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn with_prune_imports(mut self, prune: bool) -> Self {
        self.prune_imports = prune;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        if config.module.is_empty() {
            return Err(ConfigError::EmptyModule);
        }
        Ok(config)
    }
}

// -----------------------------------------------------------------------------
// Inliner
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineSummary {
    /// References replaced by a string literal.
    pub inlined: usize,
    /// Target specifiers removed by pruning.
    pub pruned_specifiers: usize,
    /// Import declarations removed because pruning left them empty.
    pub removed_imports: usize,
}

#[derive(Debug)]
pub struct ImportInliner {
    config: Config,
    // local binding -> name exported by the target module
    targets: HashMap<Id, String>,
    summary: InlineSummary,
}

impl ImportInliner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            targets: HashMap::new(),
            summary: InlineSummary::default(),
        }
    }

    pub fn summary(&self) -> InlineSummary {
        self.summary
    }

    fn is_target_import(&self, decl: &ImportDecl) -> bool {
        !decl.type_only && &*decl.src.value == self.config.module.as_str()
    }

    fn collect_targets(&mut self, module: &Module) {
        self.targets.clear();
        for item in &module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
                continue;
            };
            if !self.is_target_import(decl) {
                continue;
            }
            for spec in &decl.specifiers {
                // default and namespace imports are not constants
                let ImportSpecifier::Named(named) = spec else {
                    continue;
                };
                if named.is_type_only {
                    continue;
                }
                let exported = exported_name(named);
                log::debug!("inlining `{}` as {:?}", named.local.sym, exported);
                self.targets.insert(named.local.to_id(), exported);
            }
        }
    }

    fn lookup(&self, ident: &Ident) -> Option<&String> {
        self.targets.get(&ident.to_id())
    }

    fn prune_imports(&mut self, module: &mut Module) {
        let mut uses = RemainingUses {
            targets: &self.targets,
            used: HashSet::new(),
        };
        module.visit_with(&mut uses);
        let RemainingUses { targets, used } = uses;

        let mut pruned = 0;
        let mut removed = 0;
        module.body.retain_mut(|item| {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
                return true;
            };
            if !self.is_target_import(decl) {
                return true;
            }
            let before = decl.specifiers.len();
            decl.specifiers.retain(|spec| match spec {
                ImportSpecifier::Named(named) => {
                    let id = named.local.to_id();
                    !targets.contains_key(&id) || used.contains(&id)
                }
                _ => true,
            });
            pruned += before - decl.specifiers.len();
            // `import 'state/action-types'` was empty to begin with; keep it
            if before > 0 && decl.specifiers.is_empty() {
                removed += 1;
                return false;
            }
            true
        });
        self.summary.pruned_specifiers = pruned;
        self.summary.removed_imports = removed;
    }
}

fn exported_name(named: &ImportNamedSpecifier) -> String {
    match &named.imported {
        Some(ModuleExportName::Ident(i)) => i.sym.to_string(),
        Some(ModuleExportName::Str(s)) => s.value.to_string(),
        None => named.local.sym.to_string(),
    }
}

fn string_lit(value: &str, span: Span) -> Expr {
    Expr::Lit(Lit::Str(Str {
        span,
        value: value.into(),
        raw: None,
    }))
}

impl VisitMut for ImportInliner {
    fn visit_mut_module(&mut self, module: &mut Module) {
        self.summary = InlineSummary::default();
        self.collect_targets(module);
        if self.targets.is_empty() {
            return;
        }

        module.visit_mut_children_with(self);

        if self.config.prune_imports {
            self.prune_imports(module);
        }
        log::debug!(
            "{:?}: inlined {} reference(s), pruned {} specifier(s), removed {} import(s)",
            self.config.module,
            self.summary.inlined,
            self.summary.pruned_specifiers,
            self.summary.removed_imports
        );
    }

    // Scripts cannot import.
    fn visit_mut_script(&mut self, _: &mut Script) {
        self.summary = InlineSummary::default();
        self.targets.clear();
    }

    // Specifier identifiers are declarations, not use-sites.
    fn visit_mut_import_decl(&mut self, _: &mut ImportDecl) {}

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::Ident(ident) = expr {
            if let Some(exported) = self.lookup(ident) {
                *expr = string_lit(exported, ident.span);
                self.summary.inlined += 1;
            }
            return;
        }
        expr.visit_mut_children_with(self);
    }

    // `INC++` must stay a valid update target; the import is left alive.
    fn visit_mut_update_expr(&mut self, n: &mut UpdateExpr) {
        let mut arg = &*n.arg;
        while let Expr::Paren(paren) = arg {
            arg = &paren.expr;
        }
        if matches!(arg, Expr::Ident(_)) {
            return;
        }
        n.visit_mut_children_with(self);
    }

    fn visit_mut_prop(&mut self, prop: &mut Prop) {
        if let Prop::Shorthand(ident) = prop {
            if let Some(exported) = self.lookup(ident) {
                *prop = Prop::KeyValue(KeyValueProp {
                    key: PropName::Ident(IdentName::new(ident.sym.clone(), ident.span)),
                    value: Box::new(string_lit(exported, ident.span)),
                });
                self.summary.inlined += 1;
            }
            return;
        }
        prop.visit_mut_children_with(self);
    }
}

// Identifier uses left after inlining: `export { INC }`, `<INC />`, type refs.
struct RemainingUses<'a> {
    targets: &'a HashMap<Id, String>,
    used: HashSet<Id>,
}

impl Visit for RemainingUses<'_> {
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_ident(&mut self, ident: &Ident) {
        let id = ident.to_id();
        if self.targets.contains_key(&id) {
            self.used.insert(id);
        }
    }
}

/// Runs the inliner over `program`, which must already carry the resolver's
/// syntax contexts.
pub fn inline_imports(program: &mut Program, config: Config) -> InlineSummary {
    let mut inliner = ImportInliner::new(config);
    program.visit_mut_with(&mut inliner);
    inliner.summary()
}

// -----------------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------------

#[plugin_transform]
pub fn process_transform(mut program: Program, metadata: TransformPluginProgramMetadata) -> Program {
    let config = metadata
        .get_transform_plugin_config()
        .map(|raw| {
            Config::from_json(&raw).unwrap_or_else(|err| {
                log::warn!("{err}; falling back to defaults");
                Config::default()
            })
        })
        .unwrap_or_default();

    // The host has run its resolver, so syntax contexts identify bindings.
    inline_imports(&mut program, config);
    program
}
