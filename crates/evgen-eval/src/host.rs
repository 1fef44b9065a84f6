//! Runtime functions available to evaluated programs.
//!
//! Catalog entries name their runtime function per backend; the evaluator
//! dispatches on the native symbol. [`StandardHost`] implements the symbols
//! of the built-in catalog; embedders with their own catalog entries wrap
//! or replace it.

use evgen_types::format_number;

use crate::error::{EvalError, EvalResult};
use crate::world::{InstanceId, Value, World};

/// What a runtime function is called on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver<'a> {
    /// A scene-level (free) function.
    Scene,
    Instance(InstanceId),
    Automatism {
        instance: InstanceId,
        name: &'a str,
    },
}

pub trait Host {
    /// Call `symbol` with already evaluated arguments. The execution context
    /// argument is not passed; the host receives the world instead.
    fn call(
        &mut self,
        world: &mut World,
        symbol: &str,
        receiver: Receiver<'_>,
        args: &[Value],
    ) -> EvalResult<Value>;
}

/// The built-in catalog's runtime.
///
/// Instance and automatism accessors follow the `GetName` / `SetName`
/// convention over numeric properties, so any property works without a
/// dedicated entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHost;

impl Host for StandardHost {
    fn call(
        &mut self,
        world: &mut World,
        symbol: &str,
        receiver: Receiver<'_>,
        args: &[Value],
    ) -> EvalResult<Value> {
        match receiver {
            Receiver::Scene => scene_call(world, symbol, args),
            Receiver::Instance(id) => instance_call(world, id, symbol, args),
            Receiver::Automatism { instance, name } => {
                automatism_call(world, instance, name, symbol, args)
            }
        }
    }
}

fn arg<'v>(symbol: &str, args: &'v [Value], index: usize) -> EvalResult<&'v Value> {
    args.get(index).ok_or_else(|| EvalError::BadArguments {
        symbol: symbol.to_string(),
        message: format!("missing argument {index}"),
    })
}

/// Sound channel number; negative and fractional channels truncate toward 0.
fn channel(value: &Value) -> u32 {
    value.as_number().max(0.0) as u32
}

fn scene_call(world: &mut World, symbol: &str, args: &[Value]) -> EvalResult<Value> {
    Ok(match symbol {
        "SceneJustBegins" => Value::Bool(world.frame == 0),
        "ToString" => Value::Text(format_number(arg(symbol, args, 0)?.as_number())),
        "ToNumber" => Value::Number(arg(symbol, args, 0)?.as_text().trim().parse().unwrap_or(0.0)),
        "Abs" => Value::Number(arg(symbol, args, 0)?.as_number().abs()),
        "StrLength" => Value::Number(arg(symbol, args, 0)?.as_text().chars().count() as f64),
        "GetGlobalVolume" => Value::Number(world.global_volume),
        "SetGlobalVolume" => {
            world.global_volume = arg(symbol, args, 0)?.as_number().clamp(0.0, 100.0);
            Value::Bool(true)
        }
        "PlaySound" => {
            let file = arg(symbol, args, 0)?.as_text();
            let looping = arg(symbol, args, 1)?.as_bool();
            let volume = arg(symbol, args, 2)?.as_number();
            let pitch = arg(symbol, args, 3)?.as_number();
            world.log.push(format!(
                "PlaySound({file}, {looping}, {}, {})",
                format_number(volume),
                format_number(pitch)
            ));
            Value::Bool(true)
        }
        "PlaySoundOnChannel" => {
            let file = arg(symbol, args, 0)?.as_text();
            let channel = channel(arg(symbol, args, 1)?);
            let looping = arg(symbol, args, 2)?.as_bool();
            let volume = arg(symbol, args, 3)?.as_number().clamp(0.0, 100.0);
            let pitch = arg(symbol, args, 4)?.as_number();
            world.channel_volumes.insert(channel, volume);
            world.log.push(format!(
                "PlaySoundOnChannel({file}, {channel}, {looping}, {}, {})",
                format_number(volume),
                format_number(pitch)
            ));
            Value::Bool(true)
        }
        "GetSoundChannelVolume" => {
            let channel = channel(arg(symbol, args, 0)?);
            Value::Number(world.channel_volume(channel))
        }
        "SetSoundChannelVolume" => {
            let channel = channel(arg(symbol, args, 0)?);
            let volume = arg(symbol, args, 1)?.as_number().clamp(0.0, 100.0);
            world.channel_volumes.insert(channel, volume);
            Value::Bool(true)
        }
        other => return Err(EvalError::UnknownFunction(other.to_string())),
    })
}

fn instance_call(
    world: &mut World,
    id: InstanceId,
    symbol: &str,
    args: &[Value],
) -> EvalResult<Value> {
    let instance = world.instance_mut(id).ok_or(EvalError::MissingInstance(id))?;
    if symbol == "DeleteFromScene" {
        instance.deleted = true;
        return Ok(Value::Bool(true));
    }
    if let Some(property) = symbol.strip_prefix("Get") {
        return Ok(Value::Number(instance.property(property)));
    }
    if let Some(property) = symbol.strip_prefix("Set") {
        let value = arg(symbol, args, args.len().saturating_sub(1))?.as_number();
        instance.properties.insert(property.to_string(), value);
        return Ok(Value::Bool(true));
    }
    Err(EvalError::UnknownFunction(symbol.to_string()))
}

fn automatism_call(
    world: &mut World,
    id: InstanceId,
    name: &str,
    symbol: &str,
    args: &[Value],
) -> EvalResult<Value> {
    let instance = world.instance_mut(id).ok_or(EvalError::MissingInstance(id))?;
    let properties =
        instance
            .automatisms
            .get_mut(name)
            .ok_or_else(|| EvalError::MissingAutomatism {
                instance: id,
                automatism: name.to_string(),
            })?;
    match symbol {
        "IsMoving" => {
            let speed = properties.get("Speed").copied().unwrap_or(0.0);
            Ok(Value::Bool(speed != 0.0))
        }
        "SimulateControl" => {
            let key = arg(symbol, args, 0)?.as_text();
            world.log.push(format!("SimulateControl({id}, {name}, {key})"));
            Ok(Value::Bool(true))
        }
        _ => {
            if let Some(property) = symbol.strip_prefix("Get") {
                return Ok(Value::Number(properties.get(property).copied().unwrap_or(0.0)));
            }
            if let Some(property) = symbol.strip_prefix("Set") {
                let value = arg(symbol, args, args.len().saturating_sub(1))?.as_number();
                properties.insert(property.to_string(), value);
                return Ok(Value::Bool(true));
            }
            Err(EvalError::UnknownFunction(symbol.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_accessors_by_convention() {
        let mut world = World::new();
        let hero = world.spawn("Hero", 3.0, 4.0);
        let mut host = StandardHost;
        let x = host
            .call(&mut world, "GetX", Receiver::Instance(hero), &[])
            .unwrap();
        assert_eq!(x, Value::Number(3.0));
        host.call(&mut world, "SetY", Receiver::Instance(hero), &[Value::Number(9.0)])
            .unwrap();
        assert_eq!(world.instance(hero).unwrap().property("Y"), 9.0);
    }

    #[test]
    fn missing_automatism_is_an_error() {
        let mut world = World::new();
        let hero = world.spawn("Hero", 0.0, 0.0);
        let receiver = Receiver::Automatism {
            instance: hero,
            name: "Move",
        };
        let err = StandardHost
            .call(&mut world, "GetSpeed", receiver, &[])
            .unwrap_err();
        assert!(matches!(err, EvalError::MissingAutomatism { .. }));
    }

    #[test]
    fn unknown_scene_function() {
        let mut world = World::new();
        let err = StandardHost
            .call(&mut world, "Teleport", Receiver::Scene, &[])
            .unwrap_err();
        assert_eq!(err, EvalError::UnknownFunction("Teleport".into()));
    }
}
