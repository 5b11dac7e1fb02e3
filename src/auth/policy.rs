//! Role- and ownership-based authorization
//!
//! [`AuthorizationEngine::authorize`] looks up the rule for an (action,
//! resource) pair and evaluates it against the principal. The rule table is
//! closed: asking about a pair it does not list is a programming error and
//! yields [`CatalogError::Fatal`], never a denial.

use crate::core::entity::EntityKind;
use crate::core::error::CatalogError;
use crate::entities::{Account, Book, Genre, Review, Role};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: Uuid,
    pub username: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username.clone(),
            roles: account.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Modify,
    Delete,
    Deactivate,
    Vote,
    ManageRoles,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Modify => "modify",
            Action::Delete => "delete",
            Action::Deactivate => "deactivate",
            Action::Vote => "vote on",
            Action::ManageRoles => "manage roles of",
        };
        f.write_str(name)
    }
}

/// What an action targets, with the ownership facts the rules need
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Book(&'a Book),
    Review(&'a Review),
    Genre(&'a Genre),
    Account(&'a Account),
    /// A collection, for actions that precede the resource's existence
    Collection(EntityKind),
}

impl Resource<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Resource::Book(_) => EntityKind::Book,
            Resource::Review(_) => EntityKind::Review,
            Resource::Genre(_) => EntityKind::Genre,
            Resource::Account(_) => EntityKind::Account,
            Resource::Collection(kind) => *kind,
        }
    }

    fn author_id(&self) -> Option<Uuid> {
        match self {
            Resource::Book(book) => Some(book.author_id),
            Resource::Review(review) => Some(review.author_id),
            _ => None,
        }
    }

    fn is_co_author(&self, account_id: Uuid) -> bool {
        match self {
            Resource::Book(book) => book.is_co_author(account_id),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Building block of the rule table
#[derive(Debug, Clone)]
pub enum Rule {
    /// Any principal
    Anyone,
    /// The resource's author
    Author,
    /// A co-author of the resource
    CoAuthor,
    /// Anyone but the resource's author
    NotAuthor,
    /// Principal holds this role
    HasRole(Role),
    /// At least one inner rule holds
    AnyOf(Vec<Rule>),
}

impl Rule {
    pub fn check(&self, principal: &Principal, resource: &Resource<'_>) -> bool {
        match self {
            Rule::Anyone => true,
            Rule::Author => resource.author_id() == Some(principal.account_id),
            Rule::CoAuthor => resource.is_co_author(principal.account_id),
            Rule::NotAuthor => resource
                .author_id()
                .is_some_and(|author| author != principal.account_id),
            Rule::HasRole(role) => principal.has_role(*role),
            Rule::AnyOf(rules) => rules.iter().any(|rule| rule.check(principal, resource)),
        }
    }
}

/// Stateless policy evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine;

impl AuthorizationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rule governing `action` on a resource of `kind`, if the table lists one
    pub fn rule_for(&self, action: Action, resource: &Resource<'_>) -> Option<Rule> {
        use crate::core::entity::EntityKind as K;

        let staff = || Rule::AnyOf(vec![Rule::HasRole(Role::Moderator), Rule::HasRole(Role::Admin)]);

        let rule = match (action, resource) {
            (Action::Read, _) => Rule::Anyone,

            (Action::Modify | Action::Delete, Resource::Book(_)) => Rule::AnyOf(vec![
                Rule::Author,
                Rule::CoAuthor,
                Rule::HasRole(Role::Moderator),
                Rule::HasRole(Role::Admin),
            ]),

            (Action::Modify, Resource::Review(_)) => Rule::Author,
            (Action::Delete, Resource::Review(_)) => {
                Rule::AnyOf(vec![Rule::Author, Rule::HasRole(Role::Moderator)])
            }
            (Action::Vote, Resource::Review(_)) => Rule::NotAuthor,

            (Action::Create, Resource::Collection(K::Book | K::Review)) => Rule::Anyone,
            (Action::Create, Resource::Collection(K::Genre)) => staff(),
            (Action::Modify, Resource::Genre(_)) => staff(),
            (Action::Deactivate | Action::Delete, Resource::Genre(_)) => Rule::HasRole(Role::Admin),

            (Action::ManageRoles, Resource::Account(_)) => Rule::HasRole(Role::Admin),

            _ => return None,
        };
        Some(rule)
    }

    /// Decide whether `principal` may perform `action` on `resource`
    pub fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        resource: &Resource<'_>,
    ) -> Result<Decision, CatalogError> {
        let Some(rule) = self.rule_for(action, resource) else {
            tracing::error!(
                action = %action,
                resource = %resource.kind(),
                "authorization requested for an unmapped action"
            );
            return Err(CatalogError::Fatal(format!(
                "no authorization rule for {} on {}",
                action,
                resource.kind()
            )));
        };

        if rule.check(principal, resource) {
            Ok(Decision::Allow)
        } else {
            Ok(Decision::Deny)
        }
    }

    /// Like [`authorize`](Self::authorize) but turns a denial into `Forbidden`
    pub fn require(
        &self,
        principal: &Principal,
        action: Action,
        resource: &Resource<'_>,
    ) -> Result<(), CatalogError> {
        match self.authorize(principal, action, resource)? {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                tracing::warn!(
                    principal = %principal.username,
                    action = %action,
                    resource = %resource.kind(),
                    "access denied"
                );
                Err(CatalogError::forbidden(format!(
                    "not allowed to {} this {}",
                    action,
                    resource.kind()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[Role]) -> Principal {
        let mut set = BTreeSet::from([Role::Reader]);
        set.extend(roles.iter().copied());
        Principal {
            account_id: Uuid::new_v4(),
            username: "someone".into(),
            roles: set,
        }
    }

    fn allowed(p: &Principal, action: Action, resource: Resource<'_>) -> bool {
        AuthorizationEngine::new()
            .authorize(p, action, &resource)
            .unwrap()
            .is_allowed()
    }

    #[test]
    fn test_book_modify_rules() {
        let author = principal(&[]);
        let co_author = principal(&[]);
        let stranger = principal(&[]);
        let mut book = Book::new("Dune", author.account_id);
        book.co_author_ids.insert(co_author.account_id);

        assert!(allowed(&author, Action::Modify, Resource::Book(&book)));
        assert!(allowed(&co_author, Action::Modify, Resource::Book(&book)));
        assert!(allowed(&principal(&[Role::Moderator]), Action::Modify, Resource::Book(&book)));
        assert!(allowed(&principal(&[Role::Admin]), Action::Delete, Resource::Book(&book)));
        assert!(!allowed(&stranger, Action::Modify, Resource::Book(&book)));
        assert!(!allowed(&stranger, Action::Delete, Resource::Book(&book)));
    }

    #[test]
    fn test_review_rules() {
        let author = principal(&[]);
        let review = Review::new(author.account_id, Uuid::new_v4(), 4, "t", "c");
        let moderator = principal(&[Role::Moderator]);
        let admin = principal(&[Role::Admin]);

        assert!(allowed(&author, Action::Modify, Resource::Review(&review)));
        assert!(!allowed(&moderator, Action::Modify, Resource::Review(&review)));
        assert!(allowed(&moderator, Action::Delete, Resource::Review(&review)));
        assert!(!allowed(&admin, Action::Delete, Resource::Review(&review)));
        assert!(!allowed(&author, Action::Vote, Resource::Review(&review)));
        assert!(allowed(&admin, Action::Vote, Resource::Review(&review)));
    }

    #[test]
    fn test_genre_rules() {
        let genre = Genre::new("Poetry", "poetry", None);
        let reader = principal(&[]);
        let moderator = principal(&[Role::Moderator]);
        let admin = principal(&[Role::Admin]);
        let genres = Resource::Collection(EntityKind::Genre);

        assert!(!allowed(&reader, Action::Create, genres));
        assert!(allowed(&moderator, Action::Create, genres));
        assert!(allowed(&moderator, Action::Modify, Resource::Genre(&genre)));
        assert!(!allowed(&moderator, Action::Deactivate, Resource::Genre(&genre)));
        assert!(allowed(&admin, Action::Delete, Resource::Genre(&genre)));
        assert!(allowed(&reader, Action::Read, Resource::Genre(&genre)));
    }

    #[test]
    fn test_unmapped_pair_is_fatal() {
        let genre = Genre::new("Poetry", "poetry", None);
        let result = AuthorizationEngine::new().authorize(
            &principal(&[Role::Admin]),
            Action::Vote,
            &Resource::Genre(&genre),
        );
        assert!(matches!(result, Err(CatalogError::Fatal(_))));
    }

    #[test]
    fn test_require_maps_denial_to_forbidden() {
        let book = Book::new("Dune", Uuid::new_v4());
        let result = AuthorizationEngine::new().require(
            &principal(&[]),
            Action::Delete,
            &Resource::Book(&book),
        );
        assert!(matches!(result, Err(CatalogError::Forbidden { .. })));
    }
}
