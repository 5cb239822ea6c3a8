//! The account service: sign-up, sign-in, and email verification.
//!
//! Transport is the shell's business; the core only names the
//! operations and consumes their typed outcomes.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct Accounts<E> {
    context: CapabilityContext<AccountsOperation, E>,
}

impl<Ev> Capability<Ev> for Accounts<Ev> {
    type Operation = AccountsOperation;
    type MappedSelf<MappedEv> = Accounts<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Accounts::new(self.context.map_event(f))
    }
}

impl<E> Accounts<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<AccountsOperation, E>) -> Self {
        Self { context }
    }

    pub fn sign_in<F>(&self, email: String, password: String, make_event: F)
    where
        F: FnOnce(AccountsOutput) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(AccountsOperation::SignIn { email, password }, make_event);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn sign_up<F>(
        &self,
        name: String,
        email: String,
        password: String,
        business_manages: String,
        manages_for: String,
        make_event: F,
    ) where
        F: FnOnce(AccountsOutput) -> E + Send + 'static,
    {
        self.context.request_from_shell(
            AccountsOperation::SignUp {
                name,
                email,
                password,
                business_manages,
                manages_for,
            },
            make_event,
        );
    }

    pub fn verify_email<F>(&self, email: String, code: String, make_event: F)
    where
        F: FnOnce(AccountsOutput) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(AccountsOperation::VerifyEmail { email, code }, make_event);
    }

    pub fn resend_verification<F>(&self, email: String, make_event: F)
    where
        F: FnOnce(AccountsOutput) -> E + Send + 'static,
    {
        self.context
            .request_from_shell(AccountsOperation::ResendVerification { email }, make_event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountsOperation {
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        name: String,
        email: String,
        password: String,
        business_manages: String,
        manages_for: String,
    },
    VerifyEmail {
        email: String,
        code: String,
    },
    ResendVerification {
        email: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    Verified { publishable_key: String },
    AlreadyVerified,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountsOutput {
    SignedIn(Result<String, String>),
    SignedUp(Result<(), String>),
    Verified(VerificationOutcome),
    Resent(ResendOutcome),
}

impl Operation for AccountsOperation {
    type Output = AccountsOutput;
}
