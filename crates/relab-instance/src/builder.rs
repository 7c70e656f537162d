//! Instance tree construction
//!
//! Walks the instantiation hierarchy from the main reactor. For every
//! instance the order is fixed: resolve its parameters against the parent,
//! build its children in declaration order, then elaborate its triggers.
//! A parent's parameters are therefore complete before any child needs them.

use crate::config::ElaborationConfig;
use crate::error::{ElaborationError, Result};
use crate::instance::{InstanceId, InstanceTree, ReactorInstance};
use crate::params::ParameterResolver;
use crate::trigger::TriggerElaborator;
use relab_ast::{DefinitionTable, ExpressionPrinter, Instantiation, ReactorDecl, ToText};
use std::collections::HashSet;
use tracing::{debug, info};

/// Builds an [`InstanceTree`] from reactor definitions
pub struct Elaborator<'a> {
    definitions: &'a DefinitionTable<'a>,
    config: &'a ElaborationConfig,
    printer: &'a dyn ExpressionPrinter,
}

/// Mutable state of one elaboration pass
struct BuildState<'a> {
    nodes: Vec<ReactorInstance>,
    /// Definitions currently being expanded, outermost first
    stack: Vec<&'a str>,
}

impl<'a> Elaborator<'a> {
    pub fn new(definitions: &'a DefinitionTable<'a>, config: &'a ElaborationConfig) -> Self {
        Self {
            definitions,
            config,
            printer: &ToText,
        }
    }

    /// Use a different printer for expressions quoted in errors
    pub fn with_printer(mut self, printer: &'a dyn ExpressionPrinter) -> Self {
        self.printer = printer;
        self
    }

    /// Elaborate the hierarchy rooted at the reactor named `main`
    pub fn elaborate(&self, main: &str) -> Result<InstanceTree> {
        let root = self
            .definitions
            .get(main)
            .ok_or_else(|| ElaborationError::UnresolvedReactor {
                instance: main.to_string(),
                reactor: main.to_string(),
            })?;

        let mut state = BuildState {
            nodes: Vec::new(),
            stack: Vec::new(),
        };
        self.build(&mut state, root, &root.name, None, None)?;

        let tree = InstanceTree::from_nodes(state.nodes);
        info!("Elaborated {} into {} instances", main, tree.len());
        Ok(tree)
    }

    fn build(
        &self,
        state: &mut BuildState<'a>,
        reactor: &'a ReactorDecl,
        name: &str,
        site: Option<&Instantiation>,
        parent: Option<InstanceId>,
    ) -> Result<InstanceId> {
        let (path, depth) = match parent {
            Some(p) => {
                let parent = &state.nodes[p.index()];
                (format!("{}.{}", parent.qualified_name(), name), parent.depth + 1)
            }
            None => (name.to_string(), 0),
        };

        if depth > self.config.max_depth {
            return Err(ElaborationError::DepthLimitExceeded {
                instance: path,
                limit: self.config.max_depth,
            });
        }

        // Parameters first; they may read the parent's resolved values
        let resolver = ParameterResolver::new(self.printer);
        let parameters = resolver.resolve(
            &path,
            reactor,
            site,
            parent.map(|p| &state.nodes[p.index()]),
        )?;

        let id = InstanceId(state.nodes.len());
        let mut instance =
            ReactorInstance::new(id, name, &reactor.name, parent, depth, path.as_str());
        instance.parameters = parameters;
        state.nodes.push(instance);
        if let Some(p) = parent {
            state.nodes[p.index()].children.push(id);
        }
        debug!("Created instance {} of {}", path, reactor.name);

        state.stack.push(reactor.name.as_str());
        let mut site_names = HashSet::with_capacity(reactor.instantiations.len());
        for site in &reactor.instantiations {
            if !site_names.insert(site.name.as_str()) {
                return Err(ElaborationError::DuplicateName {
                    instance: path,
                    name: site.name.clone(),
                });
            }

            let child = self.definitions.get(&site.reactor).ok_or_else(|| {
                ElaborationError::UnresolvedReactor {
                    instance: format!("{}.{}", path, site.name),
                    reactor: site.reactor.clone(),
                }
            })?;

            if let Some(start) = state.stack.iter().position(|d| *d == child.name) {
                let mut cycle: Vec<String> =
                    state.stack[start..].iter().map(|d| d.to_string()).collect();
                cycle.push(child.name.clone());
                return Err(ElaborationError::CyclicInstantiation { cycle });
            }

            self.build(state, child, &site.name, Some(site), Some(id))?;
        }
        state.stack.pop();

        let elaborator = TriggerElaborator::new(self.config, self.printer);
        let triggers = elaborator.elaborate(reactor, Some(&state.nodes[id.index()]))?;
        debug!("{}: {} triggers", path, triggers.len());
        state.nodes[id.index()].triggers = triggers;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use relab_ast::{Expr, Program, TimeValue};

    fn elaborate(program: &Program) -> Result<InstanceTree> {
        let definitions = program.definitions()?;
        let config = ElaborationConfig::default();
        Elaborator::new(&definitions, &config).elaborate(&program.main)
    }

    #[test]
    fn test_single_root() {
        let program = Program::new("Main", vec![ReactorDecl::new("Main")]);
        let tree = elaborate(&program).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().qualified_name(), "Main");
        assert!(tree.root().startup().is_some());
    }

    #[test]
    fn test_children_in_declaration_order() {
        let program = Program::new(
            "Main",
            vec![
                ReactorDecl::new("Main")
                    .with_instance("first", "Leaf", &[])
                    .with_instance("second", "Leaf", &[]),
                ReactorDecl::new("Leaf"),
            ],
        );
        let tree = elaborate(&program).unwrap();

        let names: Vec<_> = tree
            .children_of(InstanceId::ROOT)
            .map(|c| c.qualified_name().to_string())
            .collect();
        assert_eq!(names, vec!["Main.first", "Main.second"]);
    }

    #[test]
    fn test_override_chain_through_parent() {
        let program = Program::new(
            "Main",
            vec![
                ReactorDecl::new("Main")
                    .with_parameter("rate", Expr::Time(TimeValue::msec(5)))
                    .with_instance("mid", "Mid", &[("rate", Expr::param("rate"))]),
                ReactorDecl::new("Mid")
                    .with_parameter("rate", Expr::Time(TimeValue::msec(1)))
                    .with_instance("leaf", "Leaf", &[("period", Expr::param("rate"))]),
                ReactorDecl::new("Leaf")
                    .with_parameter("period", Expr::Time(TimeValue::sec(1)))
                    .with_timer("t", None, Some(Expr::param("period"))),
            ],
        );
        let tree = elaborate(&program).unwrap();

        let leaf = tree.find("Main.mid.leaf").unwrap();
        assert_eq!(
            leaf.parameter("period").unwrap().value,
            Value::Time(TimeValue::msec(5))
        );
        let (_, t) = leaf.timers().find(|(trigger, _)| trigger.name == "t").unwrap();
        assert_eq!(t.period, TimeValue::msec(5));
    }

    #[test]
    fn test_direct_self_instantiation() {
        let program = Program::new(
            "Main",
            vec![ReactorDecl::new("Main").with_instance("again", "Main", &[])],
        );

        assert_eq!(
            elaborate(&program).unwrap_err(),
            ElaborationError::CyclicInstantiation {
                cycle: vec!["Main".to_string(), "Main".to_string()]
            }
        );
    }

    #[test]
    fn test_unresolved_reactor() {
        let program = Program::new(
            "Main",
            vec![ReactorDecl::new("Main").with_instance("ghost", "Ghost", &[])],
        );

        assert_eq!(
            elaborate(&program).unwrap_err(),
            ElaborationError::UnresolvedReactor {
                instance: "Main.ghost".to_string(),
                reactor: "Ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_main() {
        let program = Program::new("Main", vec![ReactorDecl::new("Other")]);
        assert!(matches!(
            elaborate(&program),
            Err(ElaborationError::UnresolvedReactor { reactor, .. }) if reactor == "Main"
        ));
    }

    #[test]
    fn test_duplicate_instance_name() {
        let program = Program::new(
            "Main",
            vec![
                ReactorDecl::new("Main")
                    .with_instance("x", "Leaf", &[("p", Expr::Int(1))])
                    .with_instance("x", "Leaf", &[("p", Expr::Int(2))]),
                ReactorDecl::new("Leaf").with_parameter("p", Expr::Int(0)),
            ],
        );

        assert_eq!(
            elaborate(&program).unwrap_err(),
            ElaborationError::DuplicateName {
                instance: "Main".to_string(),
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let program = Program::new(
            "Main",
            vec![
                ReactorDecl::new("Main").with_instance("a", "A", &[]),
                ReactorDecl::new("A").with_instance("b", "B", &[]),
                ReactorDecl::new("B"),
            ],
        );
        let definitions = program.definitions().unwrap();
        let config = ElaborationConfig::default().with_max_depth(1);

        assert_eq!(
            Elaborator::new(&definitions, &config)
                .elaborate("Main")
                .unwrap_err(),
            ElaborationError::DepthLimitExceeded {
                instance: "Main.a.b".to_string(),
                limit: 1,
            }
        );
    }
}
