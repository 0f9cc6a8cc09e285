// Copyright © 2025 Stephan Kunz

//! `step()`: the single primitive both execution modes (§4.C) share.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tinyscript::ScriptingValue;
use tracing::{Level, instrument};

use crate::ConstString;
use crate::tree::{Node, NodeId, NodeKind, Tree};

use super::error::Error;
use super::http_client::{HttpClient, HttpRequest, HttpResponse};
use super::state::{ApiCall, Bot, BotState, Frame, FrameLocals, Outcome};

/// What executing a leaf node produced.
enum LeafSignal {
    /// Normal Condition/Assert/Action/Wait outcome, folded into the parent as usual.
    Outcome(Outcome),
    /// An `Assert` (or break-configured `Condition`) came back falsy: full abort.
    Break,
    /// A tree-fatal fault: script error or `Action` HTTP failure: full abort.
    Error,
}

/// Runs `bot` to completion, one `step` at a time.
///
/// This is what a Thread-mode bot's own task calls; Step-mode debug bots instead call
/// [`step`] directly, once per external request.
#[instrument(level = Level::DEBUG, skip(bot, http), fields(bot = %bot.id()))]
pub async fn run_to_completion(bot: &mut Bot, http: &dyn HttpClient) -> BotState {
    loop {
        match step(bot, http).await {
            Ok(state) if state.is_terminal() => return state,
            Ok(_) => {}
            Err(_) => return BotState::Error,
        }
    }
}

/// Advances `bot` by exactly one unit of progress: push the next child frame, execute
/// a leaf and fold its result one level up, or pop a completed frame and fold it one
/// level up into its own parent. Never more than one of these per call.
pub async fn step(bot: &mut Bot, http: &dyn HttpClient) -> Result<BotState, Error> {
    if bot.state.is_terminal() {
        return Err(Error::AlreadyTerminal);
    }

    let tree = bot.tree().clone();
    let Some(top) = bot.stack.last().copied() else {
        bot.state = BotState::End;
        return Ok(bot.state);
    };
    let from = Some(top.node_id);
    let node = tree.node(top.node_id).ok_or(Error::DanglingNode(top.node_id))?;

    if node.kind().is_leaf() {
        let signal = execute_leaf(bot, node, http).await;
        bot.stack.pop();
        match signal {
            LeafSignal::Outcome(outcome) => fold_into_parent(&mut bot.stack, &tree, outcome)?,
            LeafSignal::Break => {
                bot.stack.clear();
                bot.state = BotState::Break;
            }
            LeafSignal::Error => {
                bot.stack.clear();
                bot.state = BotState::Error;
            }
        }
        if bot.stack.is_empty() && bot.state == BotState::Running {
            bot.state = BotState::End;
        }
        bot.advance_cursor(from, bot.stack.last().map(|f| f.node_id));
        return Ok(bot.state);
    }

    let children = tree.children(top.node_id);
    if top.completed.is_none() && top.child_cursor < children.len() {
        let child_id = children[top.child_cursor];
        bot.stack.push(new_frame(&tree, child_id));
        bot.advance_cursor(from, Some(child_id));
        return Ok(bot.state);
    }

    if top.completed.is_none() {
        // exhausted without ever being marked complete: a degenerate zero-child node.
        let default_outcome = if node.kind() == NodeKind::Selector {
            Outcome::Failure
        } else {
            Outcome::Success
        };
        if let Some(frame) = bot.stack.last_mut() {
            frame.completed = Some(default_outcome);
        }
        bot.advance_cursor(from, from);
        return Ok(bot.state);
    }

    // completed: pop it and fold its outcome into the new top, or finish if it was root.
    let outcome = top.completed.unwrap_or(Outcome::Success);
    bot.stack.pop();
    if node.kind() == NodeKind::Root || bot.stack.is_empty() {
        bot.state = BotState::End;
    } else {
        fold_into_parent(&mut bot.stack, &tree, outcome)?;
    }
    bot.advance_cursor(from, bot.stack.last().map(|f| f.node_id));
    Ok(bot.state)
}

fn new_frame(tree: &Tree, node_id: NodeId) -> Frame {
    let mut frame = Frame::new(node_id);
    frame.locals = match tree.node(node_id).map(Node::kind) {
        Some(NodeKind::Parallel) => FrameLocals::Parallel { all_success: true },
        Some(NodeKind::Loop) => FrameLocals::Loop { iterations: 0 },
        _ => FrameLocals::Plain,
    };
    frame
}

/// Updates the new top-of-stack frame (the parent of whatever was just popped) with
/// `outcome`, per its kind's control-node semantics (§4.C). Folds at most one level;
/// a frame that becomes complete as a result is picked up by a later `step` call.
fn fold_into_parent(stack: &mut [Frame], tree: &Tree, outcome: Outcome) -> Result<(), Error> {
    let Some(parent) = stack.last_mut() else {
        return Ok(());
    };
    let parent_node = tree.node(parent.node_id).ok_or(Error::DanglingNode(parent.node_id))?;
    let children_len = tree.children(parent.node_id).len();

    match parent_node.kind() {
        NodeKind::Root => {
            parent.completed = Some(outcome);
        }
        NodeKind::Sequence => {
            if outcome.is_success() {
                parent.child_cursor += 1;
                if parent.child_cursor >= children_len {
                    parent.completed = Some(Outcome::Success);
                }
            } else {
                parent.completed = Some(Outcome::Failure);
            }
        }
        NodeKind::Selector => {
            if outcome.is_success() {
                parent.completed = Some(Outcome::Success);
            } else {
                parent.child_cursor += 1;
                if parent.child_cursor >= children_len {
                    parent.completed = Some(Outcome::Failure);
                }
            }
        }
        NodeKind::Parallel => {
            if let FrameLocals::Parallel { all_success } = &mut parent.locals {
                if !outcome.is_success() {
                    *all_success = false;
                }
            }
            parent.child_cursor += 1;
            if parent.child_cursor >= children_len {
                let success = matches!(parent.locals, FrameLocals::Parallel { all_success: true });
                parent.completed = Some(Outcome::from_bool(success));
            }
        }
        NodeKind::Loop => match outcome {
            Outcome::Failure => parent.completed = Some(Outcome::Failure),
            Outcome::Success => {
                if let FrameLocals::Loop { iterations } = &mut parent.locals {
                    *iterations += 1;
                    if *iterations >= parent_node.loop_count() {
                        parent.completed = Some(Outcome::Success);
                    } else {
                        parent.child_cursor = 0;
                    }
                }
            }
        },
        NodeKind::Condition | NodeKind::Action | NodeKind::Assert | NodeKind::Wait => {
            unreachable!("leaves never hold children frames")
        }
    }
    Ok(())
}

async fn execute_leaf(bot: &mut Bot, node: &Node, http: &dyn HttpClient) -> LeafSignal {
    match node.kind() {
        NodeKind::Condition => match eval_bool(bot, node.script().unwrap_or_default()) {
            Ok(value) => LeafSignal::Outcome(Outcome::from_bool(value)),
            Err(_) => LeafSignal::Error,
        },
        NodeKind::Assert => match eval_bool(bot, node.script().unwrap_or_default()) {
            Ok(true) => LeafSignal::Outcome(Outcome::Success),
            Ok(false) => LeafSignal::Break,
            Err(_) => LeafSignal::Error,
        },
        NodeKind::Wait => {
            tokio::time::sleep(Duration::from_millis(node.wait_ms())).await;
            LeafSignal::Outcome(Outcome::Success)
        }
        NodeKind::Action => execute_action(bot, node, http).await,
        NodeKind::Root | NodeKind::Sequence | NodeKind::Selector | NodeKind::Parallel | NodeKind::Loop => {
            unreachable!("only leaf kinds reach execute_leaf")
        }
    }
}

async fn execute_action(bot: &mut Bot, node: &Node, http: &dyn HttpClient) -> LeafSignal {
    let Some(descriptor) = node.action() else {
        return LeafSignal::Error;
    };

    let method = match eval_string(bot, &descriptor.method) {
        Ok(value) => value,
        Err(err) => {
            record_api_call(bot, descriptor.url.clone(), 0, 0, 0, err.to_string());
            return LeafSignal::Error;
        }
    };
    let url = match eval_string(bot, &descriptor.url) {
        Ok(value) => value,
        Err(err) => {
            record_api_call(bot, descriptor.url.clone(), 0, 0, 0, err.to_string());
            return LeafSignal::Error;
        }
    };
    let api_key: ConstString = ConstString::from(url.as_str());

    let mut headers = Vec::with_capacity(descriptor.headers.len());
    for (name, template) in &descriptor.headers {
        match eval_string(bot, template) {
            Ok(value) => headers.push((name.to_string(), value)),
            Err(err) => {
                record_api_call(bot, api_key, 0, 0, 0, err.to_string());
                return LeafSignal::Error;
            }
        }
    }

    let body = if descriptor.body.is_empty() {
        Bytes::new()
    } else {
        match eval_string(bot, &descriptor.body) {
            Ok(value) => Bytes::from(value.into_bytes()),
            Err(err) => {
                record_api_call(bot, api_key, 0, 0, 0, err.to_string());
                return LeafSignal::Error;
            }
        }
    };
    let req_bytes = i64::try_from(body.len()).unwrap_or(i64::MAX);
    let timeout = (descriptor.timeout_ms > 0).then(|| Duration::from_millis(descriptor.timeout_ms));

    let request = HttpRequest {
        method,
        url,
        headers,
        body,
        timeout,
    };
    let started = Instant::now();
    let result = http.call(request).await;
    let consume_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    match result {
        Ok(response) => {
            let res_bytes = i64::try_from(response.body.len()).unwrap_or(i64::MAX);
            inject_response(bot, &response);
            let verdict = match node.script() {
                Some(script) if !script.is_empty() => match eval_bool(bot, script) {
                    Ok(true) => None,
                    Ok(false) => Some("rejected by action script".to_string()),
                    Err(err) => Some(err.to_string()),
                },
                _ => None,
            };
            if let Some(reason) = verdict {
                record_api_call(bot, api_key, consume_ms, req_bytes, res_bytes, reason);
                LeafSignal::Error
            } else {
                record_api_call(bot, api_key, consume_ms, req_bytes, res_bytes, String::new());
                LeafSignal::Outcome(Outcome::Success)
            }
        }
        Err(err) => {
            record_api_call(bot, api_key, consume_ms, req_bytes, 0, err.to_string());
            LeafSignal::Error
        }
    }
}

fn inject_response(bot: &mut Bot, response: &HttpResponse) {
    bot.script.set("status", ScriptingValue::Int64(i64::from(response.status)));
    bot.script
        .set("response", ScriptingValue::String(String::from_utf8_lossy(&response.body).into_owned()));
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        for (key, value) in map {
            if let Some(scripting_value) = json_to_scripting_value(&value) {
                bot.script.set(key, scripting_value);
            }
        }
    }
}

fn json_to_scripting_value(value: &serde_json::Value) -> Option<ScriptingValue> {
    match value {
        serde_json::Value::Bool(b) => Some(ScriptingValue::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ScriptingValue::Int64(i))
            } else {
                n.as_f64().map(ScriptingValue::Float64)
            }
        }
        serde_json::Value::String(s) => Some(ScriptingValue::String(s.clone())),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

fn record_api_call(bot: &mut Bot, api: ConstString, consume_ms: i64, req_bytes: i64, res_bytes: i64, err: String) {
    bot.report.push(ApiCall {
        api,
        consume_ms,
        req_bytes,
        res_bytes,
        err: err.into(),
    });
}

fn eval_bool(bot: &mut Bot, script: &str) -> Result<bool, Error> {
    match bot.script.eval(script)? {
        ScriptingValue::Boolean(value) => Ok(value),
        _ => Err(Error::NotBoolean),
    }
}

fn eval_string(bot: &mut Bot, template: &str) -> Result<String, Error> {
    Ok(match bot.script.eval(template)? {
        ScriptingValue::String(s) => s,
        ScriptingValue::Boolean(b) => b.to_string(),
        ScriptingValue::Int64(i) => i.to_string(),
        ScriptingValue::Float64(f) => f.to_string(),
        ScriptingValue::Nil() => String::new(),
    })
}
