//! Sample-item insertion for the source table.

use aws_sdk_dynamodb::types::AttributeValue;

use crate::backend::ResourceRef;
use crate::sample_data::SampleUser;

use super::super::{AwsBackend, AwsBackendError};

fn user_item(user: &SampleUser) -> Vec<(String, AttributeValue)> {
    vec![
        (
            String::from("UserID"),
            AttributeValue::S(user.user_id.clone()),
        ),
        (
            String::from("Timestamp"),
            AttributeValue::N(user.timestamp.to_string()),
        ),
        (String::from("Name"), AttributeValue::S(user.name.clone())),
        (String::from("Email"), AttributeValue::S(user.email.clone())),
        (
            String::from("Department"),
            AttributeValue::S(user.department.clone()),
        ),
    ]
}

impl AwsBackend {
    /// Inserts the given users into the table and returns how many items the
    /// table reports afterwards via a bounded scan.
    ///
    /// # Errors
    ///
    /// Returns [`AwsBackendError::Provider`] when a put or the verifying
    /// scan fails.
    pub async fn populate_table(
        &self,
        resource: &ResourceRef,
        users: &[SampleUser],
    ) -> Result<usize, AwsBackendError> {
        let client = self.dynamodb(&resource.region);
        for user in users {
            let mut request = client.put_item().table_name(&resource.name);
            for (key, value) in user_item(user) {
                request = request.item(key, value);
            }
            request.send().await.map_err(|err| AwsBackendError::Provider {
                message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
            })?;
        }

        let scanned = client
            .scan()
            .table_name(&resource.name)
            .limit(10)
            .send()
            .await
            .map_err(|err| AwsBackendError::Provider {
                message: aws_sdk_dynamodb::error::DisplayErrorContext(&err).to_string(),
            })?;
        usize::try_from(scanned.count()).map_err(|err| AwsBackendError::Provider {
            message: format!("scan count out of range: {err}"),
        })
    }
}
