//! Hand-written GraphQL documents for cart operations.
//!
//! Every operation selects the same cart fields via a shared fragment so that
//! each response carries the full authoritative cart. Documents are composed
//! at call time by [`document`].

/// Selection set shared by every cart operation.
///
/// `lines(first: 100)` is far above what the storefront UI allows a shopper
/// to accumulate; pagination of cart lines is deliberately not implemented.
pub const CART_FIELDS: &str = r"
fragment cartFields on Cart {
  id
  checkoutUrl
  totalQuantity
  cost {
    subtotalAmount {
      amount
      currencyCode
    }
    totalAmount {
      amount
      currencyCode
    }
    totalTaxAmount {
      amount
      currencyCode
    }
  }
  lines(first: 100) {
    edges {
      node {
        id
        quantity
        cost {
          amountPerQuantity {
            amount
            currencyCode
          }
          totalAmount {
            amount
            currencyCode
          }
        }
        merchandise {
          ... on ProductVariant {
            id
            title
            price {
              amount
              currencyCode
            }
            image {
              url
              altText
            }
            product {
              id
              handle
              title
              featuredImage {
                url
                altText
              }
            }
          }
        }
      }
    }
  }
}";

/// Create a new cart, optionally seeded with initial lines.
pub const CART_CREATE: &str = r"
mutation cartCreate($input: CartInput!) {
  cartCreate(input: $input) {
    cart {
      ...cartFields
    }
    userErrors {
      code
      field
      message
    }
  }
}";

/// Fetch a cart by id. Returns null for unknown or expired ids.
pub const CART_QUERY: &str = r"
query cartQuery($cartId: ID!) {
  cart(id: $cartId) {
    ...cartFields
  }
}";

/// Add lines to an existing cart.
pub const CART_LINES_ADD: &str = r"
mutation cartLinesAdd($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart {
      ...cartFields
    }
    userErrors {
      code
      field
      message
    }
  }
}";

/// Update quantities on existing cart lines.
pub const CART_LINES_UPDATE: &str = r"
mutation cartLinesUpdate($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart {
      ...cartFields
    }
    userErrors {
      code
      field
      message
    }
  }
}";

/// Remove lines from an existing cart.
pub const CART_LINES_REMOVE: &str = r"
mutation cartLinesRemove($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart {
      ...cartFields
    }
    userErrors {
      code
      field
      message
    }
  }
}";

/// Compose a complete GraphQL document from an operation and the cart fragment.
#[must_use]
pub fn document(operation: &str) -> String {
    format!("{operation}\n{CART_FIELDS}")
}
