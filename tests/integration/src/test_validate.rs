//! Validation integration tests.

#[cfg(test)]
mod tests {
    use stowage_model::{IntelligentTieringPolicy, StorageSpecific};

    use crate::{
        bucket_of, cleanup_bucket, provisioner, s3_client, storage_area_request,
        test_data_product, workload_request,
    };

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_validate_new_storage_area() {
        let provisioner = provisioner().await;
        let product = test_data_product("valid");
        let request = storage_area_request(&product, "raw", StorageSpecific::new("eu-west-1"));

        provisioner.validate(&request).await.expect("validate");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_non_storage_component() {
        let provisioner = provisioner().await;
        let product = test_data_product("kind");

        let failed = provisioner
            .validate(&workload_request(&product))
            .await
            .unwrap_err();
        assert!(failed.message.contains("is not a valid Storage Area"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_every_invalid_field() {
        let provisioner = provisioner().await;
        let product = test_data_product("fields");
        let mut specific = StorageSpecific::new("us-east-1");
        specific.intelligent_tiering_configuration = Some(IntelligentTieringPolicy {
            archive_access_tier_enabled: true,
            archive_access_tier_days: 10,
            deep_archive_access_tier_enabled: true,
            deep_archive_access_tier_days: 10,
        });
        let request = storage_area_request(&product, "raw", specific);

        let failed = provisioner.provision(&request).await.unwrap_err();
        assert_eq!(failed.problems.len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_region_change_of_existing_bucket() {
        let client = s3_client().await;
        let provisioner = provisioner().await;
        let product = test_data_product("region");
        let bucket = bucket_of(&product);

        let request = storage_area_request(&product, "raw", StorageSpecific::new("us-east-1"));
        provisioner.provision(&request).await.expect("provision");

        let moved = storage_area_request(&product, "raw", StorageSpecific::new("eu-west-1"));
        let failed = provisioner.validate(&moved).await.unwrap_err();
        assert!(failed.message.contains(&bucket));
        assert!(failed.message.contains("eu-west-1"));

        cleanup_bucket(&client, &bucket).await;
    }
}
