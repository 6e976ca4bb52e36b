// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Permission documents for add-ons that act on the cloud account.

use serde_json::{json, Value};

/// Load-balancer controller policy, as published by the controller project.
const LOAD_BALANCER_CONTROLLER_POLICY: &str =
    include_str!("policies/aws-load-balancer-controller.json");

/// Policy letting the DNS syncer manage records in every hosted zone.
#[must_use]
pub fn external_dns_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["route53:ChangeResourceRecordSets"],
                "Resource": ["arn:aws:route53:::hostedzone/*"]
            },
            {
                "Effect": "Allow",
                "Action": [
                    "route53:ListHostedZones",
                    "route53:ListResourceRecordSets",
                    "route53:ListTagsForResource"
                ],
                "Resource": ["*"]
            }
        ]
    })
}

/// Policy for the load-balancer controller.
///
/// # Errors
///
/// Returns an error if the embedded document is not valid JSON.
pub fn load_balancer_controller_policy() -> Result<Value, serde_json::Error> {
    serde_json::from_str(LOAD_BALANCER_CONTROLLER_POLICY)
}
