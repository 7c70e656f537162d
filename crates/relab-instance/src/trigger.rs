//! Trigger instances
//!
//! Timers, actions and ports share identity (a name and the instance that
//! declares them) and differ only in their payload, so they are one tagged
//! type rather than a hierarchy.
//!
//! A timer's offset and period are fixed here. When a field names a
//! parameter, the first resolved value of that parameter in the declaring
//! instance is used; later changes to the parameter never reach the timer.

use crate::config::ElaborationConfig;
use crate::error::{ElaborationError, Result};
use crate::instance::{InstanceId, ReactorInstance};
use crate::value::Value;
use relab_ast::{
    ActionDecl, ActionOrigin, ExpressionPrinter, Expr, PortDecl, ReactorDecl, TimeValue, TimerDecl,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// A schedulable entity declared on a reactor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInstance {
    /// Declaring instance; a back-reference, not ownership
    pub parent: InstanceId,
    pub name: String,
    pub kind: TriggerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Timer(TimerInstance),
    Action(ActionInstance),
    Port(PortInstance),
}

/// Timer with concrete timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInstance {
    pub offset: TimeValue,
    /// Zero means the timer fires once
    pub period: TimeValue,
    /// True for the implicit startup trigger, which has no declaration
    pub startup: bool,
}

impl TimerInstance {
    pub fn is_periodic(&self) -> bool {
        !self.period.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub origin: ActionOrigin,
    pub min_delay: TimeValue,
    pub min_spacing: Option<TimeValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInstance {
    pub direction: PortDirection,
    /// Number of channels for a multiport, None for a plain port
    pub width: Option<usize>,
}

impl PortInstance {
    pub fn is_multiport(&self) -> bool {
        self.width.is_some()
    }
}

impl TriggerInstance {
    pub fn as_timer(&self) -> Option<&TimerInstance> {
        match &self.kind {
            TriggerKind::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionInstance> {
        match &self.kind {
            TriggerKind::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<&PortInstance> {
        match &self.kind {
            TriggerKind::Port(port) => Some(port),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TriggerKind::Timer(t) if t.startup => write!(f, "startup {}", self.name),
            TriggerKind::Timer(t) => {
                write!(f, "timer {}(offset = {}, period = {})", self.name, t.offset, t.period)
            }
            TriggerKind::Action(a) => {
                let origin = match a.origin {
                    ActionOrigin::Logical => "logical",
                    ActionOrigin::Physical => "physical",
                };
                write!(f, "{} action {}(min_delay = {}", origin, self.name, a.min_delay)?;
                if let Some(spacing) = a.min_spacing {
                    write!(f, ", min_spacing = {}", spacing)?;
                }
                write!(f, ")")
            }
            TriggerKind::Port(p) => {
                let direction = match p.direction {
                    PortDirection::Input => "input",
                    PortDirection::Output => "output",
                };
                match p.width {
                    Some(width) => write!(f, "{}[{}] {}", direction, width, self.name),
                    None => write!(f, "{} {}", direction, self.name),
                }
            }
        }
    }
}

/// Builds trigger instances for a reactor instance whose parameters are resolved
pub struct TriggerElaborator<'a> {
    config: &'a ElaborationConfig,
    printer: &'a dyn ExpressionPrinter,
}

impl<'a> TriggerElaborator<'a> {
    pub fn new(config: &'a ElaborationConfig, printer: &'a dyn ExpressionPrinter) -> Self {
        Self { config, printer }
    }

    /// All triggers of `reactor`: startup, inputs, outputs, timers, actions
    pub fn elaborate(
        &self,
        reactor: &ReactorDecl,
        parent: Option<&ReactorInstance>,
    ) -> Result<Vec<TriggerInstance>> {
        let mut triggers = Vec::with_capacity(
            1 + reactor.inputs.len()
                + reactor.outputs.len()
                + reactor.timers.len()
                + reactor.actions.len(),
        );

        triggers.push(self.timer(None, parent)?);
        for port in &reactor.inputs {
            triggers.push(self.port(port, PortDirection::Input, parent)?);
        }
        for port in &reactor.outputs {
            triggers.push(self.port(port, PortDirection::Output, parent)?);
        }
        for timer in &reactor.timers {
            triggers.push(self.timer(Some(timer), parent)?);
        }
        for action in &reactor.actions {
            triggers.push(self.action(action, parent)?);
        }

        // Triggers share one namespace with the implicit startup timer
        let mut names = HashSet::with_capacity(triggers.len());
        if let Some(clash) = triggers.iter().find(|t| !names.insert(t.name.as_str())) {
            return Err(ElaborationError::DuplicateName {
                instance: require_parent(parent, &clash.name)?.qualified_name().to_string(),
                name: clash.name.clone(),
            });
        }
        Ok(triggers)
    }

    /// Create a timer; a missing definition denotes the startup trigger
    pub fn timer(
        &self,
        definition: Option<&TimerDecl>,
        parent: Option<&ReactorInstance>,
    ) -> Result<TriggerInstance> {
        let name = definition
            .map(|d| d.name.as_str())
            .unwrap_or(self.config.startup_name.as_str());
        let parent = require_parent(parent, name)?;

        let timer = match definition {
            None => TimerInstance {
                offset: self.config.default_offset,
                period: self.config.default_period,
                startup: true,
            },
            Some(def) => TimerInstance {
                offset: self.time_field(
                    parent,
                    name,
                    "offset",
                    def.offset.as_ref(),
                    self.config.default_offset,
                )?,
                period: self.time_field(
                    parent,
                    name,
                    "period",
                    def.period.as_ref(),
                    self.config.default_period,
                )?,
                startup: false,
            },
        };

        trace!(
            "{}: timer {} offset={} period={}",
            parent.qualified_name(),
            name,
            timer.offset,
            timer.period
        );
        Ok(TriggerInstance {
            parent: parent.id,
            name: name.to_string(),
            kind: TriggerKind::Timer(timer),
        })
    }

    pub fn action(
        &self,
        definition: &ActionDecl,
        parent: Option<&ReactorInstance>,
    ) -> Result<TriggerInstance> {
        let name = definition.name.as_str();
        let parent = require_parent(parent, name)?;

        let min_delay = self.time_field(
            parent,
            name,
            "min_delay",
            definition.min_delay.as_ref(),
            TimeValue::ZERO,
        )?;
        let min_spacing = match &definition.min_spacing {
            Some(expr) => Some(self.time_field(
                parent,
                name,
                "min_spacing",
                Some(expr),
                TimeValue::ZERO,
            )?),
            None => None,
        };

        Ok(TriggerInstance {
            parent: parent.id,
            name: name.to_string(),
            kind: TriggerKind::Action(ActionInstance {
                origin: definition.origin,
                min_delay,
                min_spacing,
            }),
        })
    }

    pub fn port(
        &self,
        definition: &PortDecl,
        direction: PortDirection,
        parent: Option<&ReactorInstance>,
    ) -> Result<TriggerInstance> {
        let name = definition.name.as_str();
        let parent = require_parent(parent, name)?;

        let width = match &definition.width {
            Some(expr) => Some(self.width_field(parent, name, expr)?),
            None => None,
        };

        Ok(TriggerInstance {
            parent: parent.id,
            name: name.to_string(),
            kind: TriggerKind::Port(PortInstance { direction, width }),
        })
    }

    /// Resolve an optional timing field against the declaring instance
    fn time_field(
        &self,
        parent: &ReactorInstance,
        trigger: &str,
        field: &str,
        expr: Option<&Expr>,
        default: TimeValue,
    ) -> Result<TimeValue> {
        let Some(expr) = expr else {
            return Ok(default);
        };

        let resolved = match expr {
            Expr::ParamRef(name) => {
                let value = self.initial_parameter_value(parent, name, expr)?;
                value.as_time().ok_or_else(|| ElaborationError::TypeMismatch {
                    instance: parent.qualified_name().to_string(),
                    field: format!("{}.{}", trigger, field),
                    expected: "time value",
                    found: self.printer.print_expr(&value.to_expr()),
                })?
            }
            Expr::Time(t) => *t,
            Expr::Int(0) => TimeValue::ZERO,
            other => {
                return Err(ElaborationError::TypeMismatch {
                    instance: parent.qualified_name().to_string(),
                    field: format!("{}.{}", trigger, field),
                    expected: "time value",
                    found: self.printer.print_expr(other),
                })
            }
        };
        Ok(resolved)
    }

    fn width_field(&self, parent: &ReactorInstance, port: &str, expr: &Expr) -> Result<usize> {
        let width = match expr {
            Expr::ParamRef(name) => self.initial_parameter_value(parent, name, expr)?.as_int(),
            Expr::Int(i) => Some(*i),
            _ => None,
        };

        width
            .and_then(|w| usize::try_from(w).ok())
            .ok_or_else(|| ElaborationError::TypeMismatch {
                instance: parent.qualified_name().to_string(),
                field: format!("{}.width", port),
                expected: "non-negative integer",
                found: self.printer.print_expr(expr),
            })
    }

    /// First resolved value of a parameter of the declaring instance
    fn initial_parameter_value(
        &self,
        parent: &ReactorInstance,
        name: &str,
        expr: &Expr,
    ) -> Result<Value> {
        let param = parent
            .parameter(name)
            .ok_or_else(|| ElaborationError::UnresolvedParameter {
                instance: parent.qualified_name().to_string(),
                parameter: name.to_string(),
                expr: Some(self.printer.print_expr(expr)),
            })?;
        Ok(param
            .initial_value()
            .cloned()
            .unwrap_or_else(|| param.value.clone()))
    }
}

fn require_parent<'p>(
    parent: Option<&'p ReactorInstance>,
    trigger: &str,
) -> Result<&'p ReactorInstance> {
    parent.ok_or_else(|| ElaborationError::MissingParent {
        trigger: trigger.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ParameterInstance, Provenance};
    use relab_ast::ToText;

    fn instance_with(params: &[(&str, Value)]) -> ReactorInstance {
        let mut inst = ReactorInstance::new(InstanceId(1), "a", "A", Some(InstanceId(0)), 1, "Main.a");
        for (name, value) in params {
            inst.parameters.insert(
                name.to_string(),
                ParameterInstance {
                    name: name.to_string(),
                    value: value.clone(),
                    provenance: Provenance::Override,
                },
            );
        }
        inst
    }

    fn timer(name: &str, offset: Option<Expr>, period: Option<Expr>) -> TimerDecl {
        TimerDecl {
            name: name.to_string(),
            offset,
            period,
        }
    }

    #[test]
    fn test_startup_timer_uses_defaults() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let trigger = elaborator.timer(None, Some(&parent)).unwrap();
        let startup = trigger.as_timer().unwrap();
        assert_eq!(trigger.name, "startup");
        assert!(startup.startup);
        assert_eq!(startup.offset, TimeValue::ZERO);
        assert_eq!(startup.period, TimeValue::ZERO);
        assert_eq!(trigger.parent, InstanceId(1));
    }

    #[test]
    fn test_timer_without_fields() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let trigger = elaborator.timer(Some(&timer("t", None, None)), Some(&parent)).unwrap();
        let t = trigger.as_timer().unwrap();
        assert_eq!(t.offset, TimeValue::ZERO);
        assert_eq!(t.period, TimeValue::ZERO);
        assert!(!t.startup);
        assert!(!t.is_periodic());
    }

    #[test]
    fn test_timer_literal_and_parameter_fields() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[(
            "p",
            Value::Array(vec![Value::Time(TimeValue::msec(20)), Value::Time(TimeValue::sec(1))]),
        )]);

        let def = timer("t", Some(Expr::param("p")), Some(Expr::Time(TimeValue::msec(100))));
        let trigger = elaborator.timer(Some(&def), Some(&parent)).unwrap();
        let t = trigger.as_timer().unwrap();
        assert_eq!(t.offset, TimeValue::msec(20));
        assert_eq!(t.period, TimeValue::msec(100));
        assert!(t.is_periodic());
    }

    #[test]
    fn test_timer_parameter_not_a_time() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[("p", Value::Str("soon".to_string()))]);

        let def = timer("t", Some(Expr::param("p")), None);
        let err = elaborator.timer(Some(&def), Some(&parent)).unwrap_err();
        assert_eq!(
            err,
            ElaborationError::TypeMismatch {
                instance: "Main.a".to_string(),
                field: "t.offset".to_string(),
                expected: "time value",
                found: "\"soon\"".to_string(),
            }
        );
    }

    #[test]
    fn test_timer_unknown_parameter() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let def = timer("t", None, Some(Expr::param("rate")));
        assert!(matches!(
            elaborator.timer(Some(&def), Some(&parent)),
            Err(ElaborationError::UnresolvedParameter { parameter, .. }) if parameter == "rate"
        ));
    }

    #[test]
    fn test_missing_parent() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);

        assert_eq!(
            elaborator.timer(None, None).unwrap_err(),
            ElaborationError::MissingParent {
                trigger: "startup".to_string()
            }
        );
        let port = PortDecl {
            name: "in".to_string(),
            ty: None,
            width: None,
        };
        assert!(matches!(
            elaborator.port(&port, PortDirection::Input, None),
            Err(ElaborationError::MissingParent { .. })
        ));
    }

    #[test]
    fn test_action_and_port_payloads() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[("n", Value::Int(4)), ("d", Value::Time(TimeValue::msec(2)))]);

        let action = ActionDecl {
            name: "a".to_string(),
            origin: ActionOrigin::Physical,
            min_delay: Some(Expr::param("d")),
            min_spacing: None,
            ty: None,
        };
        let trigger = elaborator.action(&action, Some(&parent)).unwrap();
        let a = trigger.as_action().unwrap();
        assert_eq!(a.min_delay, TimeValue::msec(2));
        assert_eq!(a.origin, ActionOrigin::Physical);
        assert_eq!(trigger.to_string(), "physical action a(min_delay = 2 msec)");

        let port = PortDecl {
            name: "out".to_string(),
            ty: None,
            width: Some(Expr::param("n")),
        };
        let trigger = elaborator.port(&port, PortDirection::Output, Some(&parent)).unwrap();
        assert_eq!(trigger.as_port().unwrap().width, Some(4));
        assert_eq!(trigger.to_string(), "output[4] out");
    }

    #[test]
    fn test_negative_port_width() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let port = PortDecl {
            name: "in".to_string(),
            ty: None,
            width: Some(Expr::Int(-1)),
        };
        assert!(matches!(
            elaborator.port(&port, PortDirection::Input, Some(&parent)),
            Err(ElaborationError::TypeMismatch { expected: "non-negative integer", .. })
        ));
    }

    #[test]
    fn test_timer_named_like_startup() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let reactor = ReactorDecl::new("A").with_timer("startup", None, None);
        assert_eq!(
            elaborator.elaborate(&reactor, Some(&parent)).unwrap_err(),
            ElaborationError::DuplicateName {
                instance: "Main.a".to_string(),
                name: "startup".to_string(),
            }
        );

        // Fine once the implicit trigger is renamed
        let config = ElaborationConfig::default().with_startup_name("boot");
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let triggers = elaborator.elaborate(&reactor, Some(&parent)).unwrap();
        assert_eq!(triggers.len(), 2);
    }

    #[test]
    fn test_elaborate_order() {
        let config = ElaborationConfig::default();
        let elaborator = TriggerElaborator::new(&config, &ToText);
        let parent = instance_with(&[]);

        let mut reactor = ReactorDecl::new("A").with_timer("t", None, None);
        reactor.inputs.push(PortDecl {
            name: "in".to_string(),
            ty: None,
            width: None,
        });

        let names: Vec<_> = elaborator
            .elaborate(&reactor, Some(&parent))
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["startup", "in", "t"]);
    }
}
