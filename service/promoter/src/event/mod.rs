use crate::promoter::PromotionRequest;
use error::*;
use log::debug;
use result::Result;
use serde::Deserialize;

/// An `SnsEvent` is the deserialization target of the payload SNS hands to a subscribed
/// Lambda function. Only the parts the promoter reads are kept, so everything else in
/// the envelope is ignored.
///
/// For the complete structure, see
/// [Using Lambda with Amazon SNS](https://docs.aws.amazon.com/lambda/latest/dg/with-sns.html).
#[derive(Deserialize, Debug)]
pub struct SnsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SnsRecord>,
}

#[derive(Deserialize, Debug)]
pub struct SnsRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Deserialize, Debug)]
pub struct SnsMessage {
    #[serde(rename = "MessageId", default)]
    pub message_id: Option<String>,
    /// The published message, verbatim. For the promoter this is itself a JSON document.
    #[serde(rename = "Message")]
    pub message: String,
}

impl SnsEvent {
    /// Decodes the promotion carried by this notification.
    ///
    /// SNS delivers exactly one record per invocation, so only the first record is read.
    pub fn promotion_request(&self) -> Result<PromotionRequest> {
        let record = self.records.first().ok_or(EventError::Empty)?;
        if let Some(id) = &record.sns.message_id {
            debug!("Decoding SNS message {}.", id);
        }
        Ok(serde_json::from_str(&record.sns.message).map_err(EventError::MalformedMessage)?)
    }
}

#[derive(Error, PromoterError, Kind, Debug)]
pub enum EventError {
    #[error("The SNS notification carried no records, so there was nothing to promote.")]
    Empty,
    #[error(
        "The SNS message is not a promotion request. It must be a JSON object with the \
string fields 'ecr_repo_name', 'ecr_tag_to_update' and 'ecr_tag_to_add'."
    )]
    MalformedMessage(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Shaped after the sample event in https://docs.aws.amazon.com/lambda/latest/dg/with-sns.html
    const SNS_EVENT: &str = r#"{
  "Records": [
    {
      "EventVersion": "1.0",
      "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:sns-lambda:21be56ed-a058-49f5-8c98-aedd2564c486",
      "EventSource": "aws:sns",
      "Sns": {
        "SignatureVersion": "1",
        "Timestamp": "2019-01-02T12:45:07.000Z",
        "Signature": "tcc6faL2yUC6dgZdmrwh1Y4cGa/ebXEkAi6RibDsvpi+tE/1+82j...65r==",
        "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-ac565b8b1a6c5d002d285f9598aa1d9b.pem",
        "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
        "Message": "{\"ecr_repo_name\": \"testrepo\", \"ecr_tag_to_update\": \"latest\", \"ecr_tag_to_add\": \"newtag\"}",
        "MessageAttributes": {},
        "Type": "Notification",
        "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe&amp;SubscriptionArn=arn:aws:sns:us-east-1:123456789012:test-lambda:21be56ed-a058-49f5-8c98-aedd2564c486",
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:sns-lambda",
        "Subject": "TestInvoke"
      }
    }
  ]
}"#;

    fn event_with_message(message: &str) -> SnsEvent {
        SnsEvent {
            records: vec![SnsRecord {
                sns: SnsMessage {
                    message_id: None,
                    message: message.to_string(),
                },
            }],
        }
    }

    #[test]
    fn decode_sns_event() {
        let event: SnsEvent = serde_json::from_str(SNS_EVENT).unwrap();
        assert_eq!(
            Some("95df01b4-ee98-5cb9-9903-4c221d41eb5e"),
            event.records[0].sns.message_id.as_deref()
        );
        let got = event.promotion_request().unwrap();
        assert_eq!(PromotionRequest::new("testrepo", "latest", "newtag"), got);
    }

    #[test]
    fn extra_message_fields_are_ignored() {
        let event = event_with_message(
            r#"{"ecr_repo_name": "r", "ecr_tag_to_update": "a", "ecr_tag_to_add": "b", "requested_by": "ci"}"#,
        );
        assert_eq!(
            PromotionRequest::new("r", "a", "b"),
            event.promotion_request().unwrap()
        );
    }

    #[test]
    fn no_records() {
        let event: SnsEvent = serde_json::from_str(r#"{"Records": []}"#).unwrap();
        let err = event.promotion_request().unwrap_err();
        assert_eq!("EventError::Empty", err.kind());
    }

    #[test]
    fn message_missing_a_field() {
        let event = event_with_message(r#"{"ecr_repo_name": "testrepo", "ecr_tag_to_update": "latest"}"#);
        let err = event.promotion_request().unwrap_err();
        assert_eq!("EventError::MalformedMessage", err.kind());
        assert!(err
            .source()
            .map(|cause| cause.to_string())
            .unwrap_or_default()
            .contains("ecr_tag_to_add"));
    }

    #[test]
    fn message_not_json() {
        let event = event_with_message("promote latest to newtag please");
        let err = event.promotion_request().unwrap_err();
        assert_eq!("EventError::MalformedMessage", err.kind());
    }
}
