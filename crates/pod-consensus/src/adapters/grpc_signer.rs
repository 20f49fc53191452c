//! gRPC client for the remote sign service.
//!
//! The wire contract is small enough that the prost messages are written by
//! hand instead of generated. One connection is dialed per call and dropped
//! on every exit path; each call carries its own timeout.

use crate::error::{PodError, PodResult};
use crate::ports::outbound::RemoteSigner;
use async_trait::async_trait;
use http::uri::PathAndQuery;
use pod_types::{Address, Hash, SignatureAlgorithm};
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::transport::Endpoint;
use tonic::Request;

const SIGN_HASH_PATH: &str = "/podpb.SignService/SignHash";
const GENERATE_RANDOM_SEED_PATH: &str = "/podpb.SignService/GenerateRandomSeed";

/// Per-call deadline covering dial and response.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignHashRequest {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub alg: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignHashResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenerateRandomSeedRequest {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub parent_seed: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub ancestor_hash: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenerateRandomSeedResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub vrf_seed: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub vrf_proof: ::prost::alloc::vec::Vec<u8>,
}

/// Remote signer talking to a configured endpoint.
#[derive(Clone, Debug)]
pub struct GrpcRemoteSigner {
    endpoint: String,
}

impl GrpcRemoteSigner {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> PodResult<Resp>
    where
        Req: prost::Message + 'static,
        Resp: prost::Message + Default + 'static,
    {
        let endpoint = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|err| PodError::RemoteSign(err.to_string()))?
            .connect_timeout(CALL_TIMEOUT)
            .timeout(CALL_TIMEOUT);
        let channel = endpoint
            .connect()
            .await
            .map_err(|err| PodError::RemoteSign(err.to_string()))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|err| PodError::RemoteSign(format!("service not ready: {err}")))?;

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .unary(Request::new(request), PathAndQuery::from_static(path), codec)
            .await
            .map_err(|status| PodError::RemoteSign(status.to_string()))?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl RemoteSigner for GrpcRemoteSigner {
    async fn sign_hash(
        &self,
        address: &Address,
        hash: &Hash,
        alg: SignatureAlgorithm,
    ) -> PodResult<Vec<u8>> {
        let request = SignHashRequest {
            address: address.to_base58(),
            hash: hash.to_vec(),
            alg: alg.as_u32(),
        };
        let response: SignHashResponse = self.unary(SIGN_HASH_PATH, request).await?;
        Ok(response.data)
    }

    async fn generate_random_seed(
        &self,
        address: &Address,
        parent_seed: &[u8],
        ancestor_hash: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)> {
        let request = GenerateRandomSeedRequest {
            address: address.to_base58(),
            parent_seed: parent_seed.to_vec(),
            ancestor_hash: ancestor_hash.to_vec(),
        };
        let response: GenerateRandomSeedResponse =
            self.unary(GENERATE_RANDOM_SEED_PATH, request).await?;
        Ok((response.vrf_seed, response.vrf_proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_request_encoding_round_trip() {
        let request = SignHashRequest {
            address: "n1abc".to_string(),
            hash: vec![7; 32],
            alg: SignatureAlgorithm::Secp256k1.as_u32(),
        };
        let bytes = request.encode_to_vec();
        let decoded = SignHashRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_surfaces_remote_sign_error() {
        let signer = GrpcRemoteSigner::new("http://127.0.0.1:1");
        let addr = Address::from_account_payload([1; 20]);
        let err = signer
            .sign_hash(&addr, &[0; 32], SignatureAlgorithm::Secp256k1)
            .await
            .unwrap_err();
        assert!(matches!(err, PodError::RemoteSign(_)));
    }
}
