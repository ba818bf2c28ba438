//! Test event payloads derived from a function's event type.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::manifest::EventType;
use crate::workspace::event_path;

#[derive(Debug, Error)]
pub enum EventError {
  #[error("failed to serialize test event: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write test event {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },
}

/// A representative invocation payload for `event_type`.
pub fn skeleton(event_type: EventType) -> Value {
  match event_type {
    EventType::Api => json!({
      "resource": "/{proxy+}",
      "path": "/hello",
      "httpMethod": "GET",
      "headers": { "Accept": "application/json" },
      "queryStringParameters": { "name": "world" },
      "pathParameters": { "proxy": "hello" },
      "requestContext": {
        "resourcePath": "/{proxy+}",
        "httpMethod": "GET",
        "stage": "dev"
      },
      "body": null,
      "isBase64Encoded": false
    }),
    EventType::Storage => json!({
      "Records": [{
        "eventVersion": "2.1",
        "eventSource": "aws:s3",
        "awsRegion": "us-east-1",
        "eventName": "ObjectCreated:Put",
        "s3": {
          "bucket": { "name": "example-bucket", "arn": "arn:aws:s3:::example-bucket" },
          "object": { "key": "uploads/example.txt", "size": 1024 }
        }
      }]
    }),
    EventType::Stream => json!({
      "Records": [{
        "eventID": "1",
        "eventName": "INSERT",
        "eventSource": "aws:dynamodb",
        "awsRegion": "us-east-1",
        "dynamodb": {
          "Keys": { "id": { "S": "101" } },
          "NewImage": { "id": { "S": "101" }, "message": { "S": "new item" } },
          "SequenceNumber": "111",
          "StreamViewType": "NEW_AND_OLD_IMAGES"
        }
      }]
    }),
    EventType::Queue => json!({
      "Records": [{
        "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
        "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
        "body": "{\"message\":\"hello\"}",
        "attributes": { "ApproximateReceiveCount": "1" },
        "messageAttributes": {},
        "eventSource": "aws:sqs",
        "eventSourceARN": "arn:aws:sqs:us-east-1:123456789012:my-queue",
        "awsRegion": "us-east-1"
      }]
    }),
    EventType::Schedule | EventType::Generic => json!({
      "version": "0",
      "id": "cdc73f9d-aea9-11e3-9d5a-835b769c0d9c",
      "detail-type": "Scheduled Event",
      "source": "aws.events",
      "region": "us-east-1",
      "time": "1970-01-01T00:00:00Z",
      "resources": ["arn:aws:events:us-east-1:123456789012:rule/example"],
      "detail": {}
    }),
  }
}

/// Write `event.json` for a function.
///
/// Returns `false` without touching the file when one exists and `overwrite`
/// is not set.
pub fn write_test_event(function_dir: &Path, event_type: EventType, overwrite: bool) -> Result<bool, EventError> {
  let path = event_path(function_dir);
  if path.exists() && !overwrite {
    debug!(path = %path.display(), "keeping existing test event");
    return Ok(false);
  }

  let content = serde_json::to_string_pretty(&skeleton(event_type))?;
  fs::write(&path, content + "\n").map_err(|e| EventError::Write {
    path: path.clone(),
    source: e,
  })?;

  debug!(path = %path.display(), %event_type, "wrote test event");
  Ok(true)
}
