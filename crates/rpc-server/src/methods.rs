//! Demo `math` namespace served by the binary.

use rpc_dispatch::{sync_fn, Args, MethodDecl, ParamDecl, RpcError, TargetType};
use serde_json::{json, Value};

/// Sum of every number in the params bag.
pub fn add(args: Args) -> rpc_dispatch::Result<Value> {
    let nums: Vec<f64> = args.parse(0)?;
    let sum: f64 = nums.iter().sum();
    if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
        Ok(json!(sum as i64))
    } else {
        Ok(json!(sum))
    }
}

/// Always answers `"hi"`.
pub fn hello(_args: Args) -> rpc_dispatch::Result<Value> {
    Ok(json!("hi"))
}

/// `a / b`; dividing by zero is an invalid `b`.
pub fn divide(args: Args) -> rpc_dispatch::Result<Value> {
    let a: f64 = args.parse(0)?;
    let b: f64 = args.parse(1)?;
    if b == 0.0 {
        return Err(RpcError::invalid_param("b", "Division by zero"));
    }
    Ok(json!(a / b))
}

/// Echo the request id.
pub fn echo_id(args: Args) -> rpc_dispatch::Result<Value> {
    Ok(args.get(0).cloned().unwrap_or(Value::Null))
}

/// Declarations of the demo `math` namespace.
pub fn math_methods() -> Vec<MethodDecl> {
    vec![
        MethodDecl::new("math", "add", sync_fn(add)).param(ParamDecl::params().required(true)),
        MethodDecl::new("math", "hello", sync_fn(hello)).param(ParamDecl::params()),
        MethodDecl::new("math", "divide", sync_fn(divide))
            .param(ParamDecl::named("a").target(TargetType::Number).required(true))
            .param(ParamDecl::named("b").target(TargetType::Number).required(true)),
        MethodDecl::new("math", "echo_id", sync_fn(echo_id)).param(ParamDecl::request_id()),
    ]
}
