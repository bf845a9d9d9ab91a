//! The standard builtin commands and operator functions.
//!
//! Operators live in the function namespace and receive exactly two
//! arguments; the container commands (`put`, `add`, `subtract`) live in the
//! command namespace and write through a reference argument. `output`
//! appends to the context's capture buffer.
//!
//! Arithmetic uses the language coercions (so a malformed string counts as
//! zero), while comparisons read numbers strictly and fall back to string
//! comparison, which is what keeps `"pear" = "apple"` from being true just
//! because neither parses as a number.

use std::cmp::Ordering;

use crate::value::Value;
use crate::vm::{RunContext, RuntimeError};

/// Tolerance used when `=` and `≠` compare values as doubles.
const EQUALITY_TOLERANCE: f64 = 1e-5;

/// Install every standard builtin into the context's two namespaces.
pub fn install_standard_builtins(context: &mut RunContext) {
    context.register_function("+", |args, ctx| {
        arithmetic(args, ctx, |x, y| Ok(x.wrapping_add(y)), |x, y| Ok(x + y))
    });
    context.register_function("-", |args, ctx| {
        arithmetic(args, ctx, |x, y| Ok(x.wrapping_sub(y)), |x, y| Ok(x - y))
    });
    context.register_function("*", |args, ctx| {
        arithmetic(args, ctx, |x, y| Ok(x.wrapping_mul(y)), |x, y| Ok(x * y))
    });
    context.register_function("/", divide);

    context.register_function("<", |args, ctx| {
        comparison(args, ctx, |ordering| ordering == Ordering::Less)
    });
    context.register_function(">", |args, ctx| {
        comparison(args, ctx, |ordering| ordering == Ordering::Greater)
    });
    context.register_function("<=", |args, ctx| {
        comparison(args, ctx, |ordering| ordering != Ordering::Greater)
    });
    context.register_function(">=", |args, ctx| {
        comparison(args, ctx, |ordering| ordering != Ordering::Less)
    });
    context.register_function("=", |args, ctx| {
        let (lhs, rhs) = expect_two(args)?;
        let equal = values_equal(lhs, rhs, &ctx.stack)?;
        ctx.push(Value::Boolean(equal))
    });
    context.register_function("≠", |args, ctx| {
        let (lhs, rhs) = expect_two(args)?;
        let equal = values_equal(lhs, rhs, &ctx.stack)?;
        ctx.push(Value::Boolean(!equal))
    });

    context.register_function("&", |args, ctx| {
        let (lhs, rhs) = expect_two(args)?;
        let text = lhs.as_string(&ctx.stack)? + &rhs.as_string(&ctx.stack)?;
        ctx.push(Value::string(text))
    });
    context.register_function("&&", |args, ctx| {
        let (lhs, rhs) = expect_two(args)?;
        let text = format!(
            "{} {}",
            lhs.as_string(&ctx.stack)?,
            rhs.as_string(&ctx.stack)?
        );
        ctx.push(Value::string(text))
    });

    context.register_command("put", put);
    context.register_command("add", add_to);
    context.register_command("subtract", subtract_from);
    context.register_command("output", output);
}

// ==================== Argument plumbing ====================

fn expect_two(args: &[Value]) -> Result<(&Value, &Value), RuntimeError> {
    match args.len() {
        0 | 1 => Err(RuntimeError::TooFewOperands),
        2 => Ok((&args[0], &args[1])),
        _ => Err(RuntimeError::TooManyOperands),
    }
}

fn expect_one(args: &[Value]) -> Result<&Value, RuntimeError> {
    match args.len() {
        0 => Err(RuntimeError::TooFewOperands),
        1 => Ok(&args[0]),
        _ => Err(RuntimeError::TooManyOperands),
    }
}

/// Resolve a container argument to the stack index it writes through.
fn container_index(container: &Value, stack: &[Value]) -> Result<usize, RuntimeError> {
    container
        .reference_index(stack)
        .ok_or(RuntimeError::InvalidPutDestination)
}

// ==================== Operator functions ====================

/// Integer arithmetic when both sides coerce to integers, double
/// arithmetic otherwise.
fn arithmetic(
    args: &[Value],
    context: &mut RunContext,
    integer_op: fn(i64, i64) -> Result<i64, RuntimeError>,
    double_op: fn(f64, f64) -> Result<f64, RuntimeError>,
) -> Result<(), RuntimeError> {
    let (lhs, rhs) = expect_two(args)?;
    let value = match (
        lhs.as_integer(&context.stack),
        rhs.as_integer(&context.stack),
    ) {
        (Ok(x), Ok(y)) => Value::Integer(integer_op(x, y)?),
        _ => {
            let x = lhs.as_double(&context.stack)?;
            let y = rhs.as_double(&context.stack)?;
            Value::Double(double_op(x, y)?)
        }
    };
    context.push(value)
}

fn divide(args: &[Value], context: &mut RunContext) -> Result<(), RuntimeError> {
    let (lhs, rhs) = expect_two(args)?;
    let x = lhs.as_double(&context.stack)?;
    let y = rhs.as_double(&context.stack)?;
    if y == 0.0 {
        return Err(RuntimeError::ZeroDivision);
    }
    context.push(Value::Double(x / y))
}

/// Strict numeric reading for comparisons: a string only counts as a
/// number when it actually parses as one.
fn strict_number(value: &Value, stack: &[Value]) -> Result<Option<f64>, RuntimeError> {
    Ok(match value.resolved(stack)? {
        Value::Integer(i) => Some(i as f64),
        Value::Double(d) => Some(d),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn strict_integer(value: &Value, stack: &[Value]) -> Result<Option<i64>, RuntimeError> {
    Ok(match value.resolved(stack)? {
        Value::Integer(i) => Some(i),
        Value::Double(d) if d.fract() == 0.0 => Some(d as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn comparison(
    args: &[Value],
    context: &mut RunContext,
    test: fn(Ordering) -> bool,
) -> Result<(), RuntimeError> {
    let (lhs, rhs) = expect_two(args)?;
    let result = match (
        strict_number(lhs, &context.stack)?,
        strict_number(rhs, &context.stack)?,
    ) {
        (Some(x), Some(y)) => x.partial_cmp(&y).map(test).unwrap_or(false),
        _ => {
            let x = lhs.as_string(&context.stack)?;
            let y = rhs.as_string(&context.stack)?;
            test(x.cmp(&y))
        }
    };
    context.push(Value::Boolean(result))
}

/// Equality tries integers, then doubles with a small tolerance, then
/// string comparison.
fn values_equal(lhs: &Value, rhs: &Value, stack: &[Value]) -> Result<bool, RuntimeError> {
    if let (Some(x), Some(y)) = (strict_integer(lhs, stack)?, strict_integer(rhs, stack)?) {
        return Ok(x == y);
    }
    if let (Some(x), Some(y)) = (strict_number(lhs, stack)?, strict_number(rhs, stack)?) {
        return Ok((x - y).abs() < EQUALITY_TOLERANCE);
    }
    Ok(lhs.as_string(stack)? == rhs.as_string(stack)?)
}

// ==================== Container commands ====================

fn put(args: &[Value], context: &mut RunContext) -> Result<(), RuntimeError> {
    let (value, container) = expect_two(args)?;
    let index = container_index(container, &context.stack)?;
    let value = value.resolved(&context.stack)?;
    context.stack[index] = value;
    Ok(())
}

fn add_to(args: &[Value], context: &mut RunContext) -> Result<(), RuntimeError> {
    let (amount, container) = expect_two(args)?;
    let index = container_index(container, &context.stack)?;
    let current = context.stack[index].clone();
    let value = match (
        current.as_integer(&context.stack),
        amount.as_integer(&context.stack),
    ) {
        (Ok(x), Ok(y)) => Value::Integer(x.wrapping_add(y)),
        _ => Value::Double(
            current.as_double(&context.stack)? + amount.as_double(&context.stack)?,
        ),
    };
    context.stack[index] = value;
    Ok(())
}

fn subtract_from(args: &[Value], context: &mut RunContext) -> Result<(), RuntimeError> {
    let (amount, container) = expect_two(args)?;
    let index = container_index(container, &context.stack)?;
    let current = context.stack[index].clone();
    let value = match (
        current.as_integer(&context.stack),
        amount.as_integer(&context.stack),
    ) {
        (Ok(x), Ok(y)) => Value::Integer(x.wrapping_sub(y)),
        _ => Value::Double(
            current.as_double(&context.stack)? - amount.as_double(&context.stack)?,
        ),
    };
    context.stack[index] = value;
    Ok(())
}

/// Append the argument and a newline to the context's output buffer.
fn output(args: &[Value], context: &mut RunContext) -> Result<(), RuntimeError> {
    let value = expect_one(args)?;
    let text = value.as_string(&context.stack)?;
    context.output.push_str(&text);
    context.output.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_number_rejects_words() {
        let stack: Vec<Value> = Vec::new();
        assert_eq!(
            strict_number(&Value::string("12.5"), &stack).unwrap(),
            Some(12.5)
        );
        assert_eq!(strict_number(&Value::string("pear"), &stack).unwrap(), None);
        assert_eq!(strict_number(&Value::Unset, &stack).unwrap(), None);
    }

    #[test]
    fn test_values_equal_falls_back_to_strings() {
        let stack: Vec<Value> = Vec::new();
        assert!(values_equal(&Value::string("pear"), &Value::string("pear"), &stack).unwrap());
        assert!(!values_equal(&Value::string("pear"), &Value::string("apple"), &stack).unwrap());
        assert!(values_equal(&Value::Integer(3), &Value::string("3"), &stack).unwrap());
        assert!(values_equal(&Value::Double(1.000001), &Value::Double(1.0), &stack).unwrap());
        assert!(!values_equal(&Value::Double(1.1), &Value::Double(1.0), &stack).unwrap());
    }

    #[test]
    fn test_inequality_builtin_pushes_negated_equality() {
        let script = std::rc::Rc::new(hypertalk_vm_parser::Script::new());
        let mut context = RunContext::new(script);
        install_standard_builtins(&mut context);
        let not_equal = context.builtin_functions.get("≠").cloned().unwrap();

        not_equal(
            &[Value::string("pear"), Value::string("apple")],
            &mut context,
        )
        .unwrap();
        assert_eq!(context.pop().unwrap(), Value::Boolean(true));

        not_equal(&[Value::Integer(3), Value::string("3")], &mut context).unwrap();
        assert_eq!(context.pop().unwrap(), Value::Boolean(false));
    }
}
