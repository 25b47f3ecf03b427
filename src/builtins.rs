use crate::evaluator::Evaluator;
use crate::value::Value;

/// Registers the reference set of host functions in the evaluator's root
/// environment. The core only defines the registration contract; everything
/// here is host-side convenience used by the driver and the REPL.
pub fn install(evaluator: &mut Evaluator) {
    evaluator.register_native("print", |args| {
        let rendered: Vec<String> = args.iter().map(|value| value.to_string()).collect();
        println!("{}", rendered.join(" "));
        Ok(Value::Undefined)
    });

    evaluator.register_native("number", |args| {
        let arg = single_argument("number", args)?;
        match arg {
            Value::Number(n) => Ok(Value::Number(*n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| format!("number() cannot parse '{}'", s)),
            other => Err(format!(
                "number() takes a string or a number, got a {}",
                other.type_name()
            )),
        }
    });

    evaluator.register_native("string", |args| {
        let arg = single_argument("string", args)?;
        Ok(Value::String(arg.to_string()))
    });

    evaluator.register_native("range", |args| {
        let (start, end) = match args {
            [Value::Number(end)] => (1.0, *end),
            [Value::Number(start), Value::Number(end)] => (*start, *end),
            _ => {
                return Err(format!(
                    "range() takes one or two numbers, got {} arguments",
                    args.len()
                ));
            }
        };
        if start.fract() != 0.0 || end.fract() != 0.0 {
            return Err("range() bounds must be integers".to_string());
        }
        let mut items = Vec::new();
        let mut current = start;
        while current <= end {
            items.push(Value::Number(current));
            current += 1.0;
        }
        Ok(Value::list(items))
    });

    evaluator.register_native("len", |args| {
        let arg = single_argument("len", args)?;
        match arg {
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::List(items) => Ok(Value::Number(items.borrow().len() as f64)),
            Value::Object(entries) => Ok(Value::Number(entries.borrow().len() as f64)),
            other => Err(format!(
                "len() takes a string, list, or object, got a {}",
                other.type_name()
            )),
        }
    });

    evaluator.register_native("type", |args| {
        let arg = single_argument("type", args)?;
        Ok(Value::String(arg.type_name().to_string()))
    });
}

fn single_argument<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, String> {
    match args {
        [arg] => Ok(arg),
        _ => Err(format!(
            "{}() takes exactly 1 argument, got {}",
            name,
            args.len()
        )),
    }
}
